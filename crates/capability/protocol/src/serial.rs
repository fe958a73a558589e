//! 串口链路
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let connector = SerialConnector::new(SerialConfig {
//!     port: "/dev/ttyUSB0".to_string(),
//!     baud_rate: 115_200,
//! });
//! reader.run(&connector, &sink, shutdown).await?;
//! ```

use crate::error::ProtocolError;
use crate::reader::{Link, LinkConnector};
use crate::types::SerialConfig;
use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;
use tracing::info;

/// 打开物理串口的连接器
#[derive(Debug, Clone)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LinkConnector for SerialConnector {
    async fn connect(&self) -> Result<Link, ProtocolError> {
        let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
            .open_native_async()
            .map_err(|err| ProtocolError::Connection(format!("{}: {}", self.config.port, err)))?;
        info!(
            target: "recap.serial",
            port = %self.config.port,
            baud_rate = self.config.baud_rate,
            "serial_port_opened"
        );
        Ok(Box::new(stream))
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.config.port, self.config.baud_rate)
    }
}

/// 列出本机检测到的串口名称
pub fn available_ports() -> Result<Vec<String>, ProtocolError> {
    let ports = tokio_serial::available_ports()
        .map_err(|err| ProtocolError::Connection(err.to_string()))?;
    Ok(ports.into_iter().map(|port| port.port_name).collect())
}
