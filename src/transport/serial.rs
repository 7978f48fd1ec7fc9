use super::Transport;
use crate::config::SerialConfig;
use crate::error::{Result, SolaxError};
use crate::logging::{StructuredLogger, get_logger};
use crate::protocol::hex_dump;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream, StopBits,
};

/// RS485 adapter opened as 8N1 without flow control
pub struct SerialTransport {
    port: SerialStream,
    device: String,
    logger: StructuredLogger,
}

impl SerialTransport {
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let logger = get_logger("serial");
        let port = tokio_serial::new(&config.device, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                SolaxError::serial(format!("Error opening '{}': {}", config.device, e))
            })?;

        logger.info(&format!(
            "Opened {} at {} baud 8N1",
            config.device, config.baud_rate
        ));

        Ok(Self {
            port,
            device: config.device.clone(),
            logger,
        })
    }
}

#[async_trait::async_trait]
impl Transport for SerialTransport {
    async fn read_available(&mut self) -> Result<Vec<u8>> {
        let pending = self
            .port
            .bytes_to_read()
            .map_err(|e| SolaxError::io(format!("{}: {}", self.device, e)))?
            as usize;

        let mut buf = vec![0u8; pending];
        let mut filled = 0;
        while filled < pending {
            let n = self.port.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);

        self.logger.trace(&format!("ComRx:{}", hex_dump(&buf)));
        Ok(buf)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.logger.trace(&format!("ComTx:{}", hex_dump(bytes)));
        self.port.write_all(bytes).await?;
        self.port.flush().await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("serial {}", self.device)
    }
}
