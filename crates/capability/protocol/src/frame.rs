//! 哨兵帧解码器
//!
//! 逐字节状态机，分空闲与累积两种模式：
//! - `<`：丢弃已累积内容，进入累积模式，开始新的空消息体
//! - `>`：消息体非空则输出；无论是否输出都清空并回到空闲
//! - 其他字节：累积模式下原样追加，空闲模式下丢弃
//!
//! 状态跨调用保留，一条消息被拆成多次物理读取时可以正确拼回。
//! 流结束时未闭合的消息体由调用方 [`FrameDecoder::reset`] 丢弃，不产生错误。

use crate::types::{START_SENTINEL, STOP_SENTINEL};

/// 帧解码器（持有解析状态）
#[derive(Debug, Default)]
pub struct FrameDecoder {
    body: Vec<u8>,
    accumulating: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入单个字节，遇到完整帧时返回消息体
    pub fn feed(&mut self, byte: u8) -> Option<String> {
        match byte {
            START_SENTINEL => {
                self.body.clear();
                self.accumulating = true;
                None
            }
            STOP_SENTINEL => {
                self.accumulating = false;
                if self.body.is_empty() {
                    return None;
                }
                let body = std::mem::take(&mut self.body);
                Some(match String::from_utf8(body) {
                    Ok(text) => text,
                    Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
                })
            }
            other => {
                if self.accumulating {
                    self.body.push(other);
                }
                None
            }
        }
    }

    /// 惰性地解码一个字节块；迭代器未消费的字节不会被喂入
    pub fn frames<'a>(&'a mut self, chunk: &'a [u8]) -> Frames<'a> {
        Frames {
            decoder: self,
            bytes: chunk.iter(),
        }
    }

    /// 丢弃未闭合的消息体并回到空闲
    pub fn reset(&mut self) {
        self.body.clear();
        self.accumulating = false;
    }

    /// 当前已累积的字节数
    pub fn pending_len(&self) -> usize {
        self.body.len()
    }

    /// 是否处于 `<` 之后、`>` 之前
    pub fn is_accumulating(&self) -> bool {
        self.accumulating
    }
}

/// [`FrameDecoder::frames`] 返回的迭代器
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
    bytes: std::slice::Iter<'a, u8>,
}

impl Iterator for Frames<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        for &byte in self.bytes.by_ref() {
            if let Some(message) = self.decoder.feed(byte) {
                return Some(message);
            }
        }
        None
    }
}
