//! 串口枚举

use crate::transport::LinkError;
use serialport::SerialPortType;

/// 可用串口信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// 系统端口名（`/dev/ttyUSB0`、`COM3` 等）
    pub name: String,
    /// 人类可读描述
    pub description: String,
}

/// 列出系统中的串口
pub fn list_ports() -> Result<Vec<PortInfo>, LinkError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|port| PortInfo {
            description: describe(&port.port_type),
            name: port.port_name,
        })
        .collect())
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => format!(
            "USB {} {} ({:04x}:{:04x})",
            usb.manufacturer.as_deref().unwrap_or("Device"),
            usb.product.as_deref().unwrap_or(""),
            usb.vid,
            usb.pid
        ),
        SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}
