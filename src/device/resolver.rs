//! Serial port discovery.
//!
//! Picks the port the bridge should open. A single generic "USB-Serial
//! Controller" is taken as-is, whatever vendor id it reports. Otherwise
//! ports are scanned in enumeration order and the first one whose vendor id
//! belongs to the wanted board wins.

use super::registry::{self, Mcu};
use crate::port::PortError;
use regex::Regex;
use std::fmt::Write as _;
use thiserror::Error;
use tracing::{debug, info};

/// Pattern identifying a generic USB to serial converter. Case-insensitive,
/// matched against the path, USB strings and hardware id of each port.
const GENERIC_CONTROLLER_PATTERN: &str = "(?i)USB-Serial Controller";

/// One enumerated serial port.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortInfo {
    /// System path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub path: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl PortInfo {
    /// A USB port with only a vendor id, mostly for tests.
    pub fn usb(path: impl Into<String>, vid: u16) -> Self {
        Self {
            path: path.into(),
            vid: Some(vid),
            ..Default::default()
        }
    }

    /// Attach a product description.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Hardware id in the `USB VID:PID=xxxx:yyyy` form.
    pub fn hwid(&self) -> String {
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => format!("USB VID:PID={:04X}:{:04X}", vid, pid),
            (Some(vid), None) => format!("USB VID={:04X}", vid),
            _ => "n/a".to_string(),
        }
    }

    /// Human-readable description: product, then manufacturer, then "n/a".
    pub fn description(&self) -> &str {
        self.product
            .as_deref()
            .or(self.manufacturer.as_deref())
            .unwrap_or("n/a")
    }

    fn haystacks(&self) -> impl Iterator<Item = String> + '_ {
        [
            Some(self.path.clone()),
            self.product.clone(),
            self.manufacturer.clone(),
            Some(self.hwid()),
        ]
        .into_iter()
        .flatten()
    }
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(info: serialport::SerialPortInfo) -> Self {
        match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => Self {
                path: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            _ => Self {
                path: info.port_name,
                ..Default::default()
            },
        }
    }
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.path, self.description())
    }
}

/// Source of the serial port list.
#[cfg_attr(test, mockall::automock)]
pub trait PortEnumerator: Send + Sync {
    /// All ports, in system order.
    fn available_ports(&self) -> Result<Vec<PortInfo>, PortError>;
}

/// Enumerates the ports the operating system reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortEnumerator for SystemPorts {
    fn available_ports(&self) -> Result<Vec<PortInfo>, PortError> {
        Ok(serialport::available_ports()?
            .into_iter()
            .map(PortInfo::from)
            .collect())
    }
}

/// A fixed port list, for tests and benchmarks.
#[derive(Debug, Default, Clone)]
pub struct FixedPorts(pub Vec<PortInfo>);

impl PortEnumerator for FixedPorts {
    fn available_ports(&self) -> Result<Vec<PortInfo>, PortError> {
        Ok(self.0.clone())
    }
}

/// Where the device choice came from. Only changes the wording of guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSource {
    #[default]
    Preferences,
    CommandLine,
    Wizard,
}

/// A successfully selected port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: String,
    /// True when the generic-controller shortcut chose the port, in which case
    /// its vendor id was never compared against the wanted board.
    pub generic_controller: bool,
}

/// Port discovery failures.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not find {} among {} serial port(s)", .wanted.nickname_determiner, .candidates.len())]
    NotFound {
        wanted: &'static Mcu,
        /// Every port that was enumerated, in order.
        candidates: Vec<PortInfo>,
        /// A supported board that does appear to be plugged in.
        suggestion: Option<&'static Mcu>,
    },

    #[error("vendor id {0} is not a supported board")]
    UnknownVendor(u16),

    #[error("failed to enumerate serial ports: {0}")]
    Enumeration(#[from] PortError),
}

impl ResolveError {
    /// Multi-line guidance for the user, printed before exiting.
    pub fn guidance(&self, source: DeviceSource) -> String {
        let mut out = String::new();
        match self {
            Self::NotFound {
                wanted,
                candidates,
                suggestion,
            } => {
                out.push_str("I couldn't find your chosen device! D:\n");
                if !candidates.is_empty() {
                    out.push_str("Here is the list of ports I did find:\n");
                    for (i, port) in candidates.iter().enumerate() {
                        let vid = port
                            .vid
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "None".to_string());
                        let _ = writeln!(out, "   {}: {} (Vendor ID: {})", i, port, vid);
                    }
                    out.push('\n');
                }
                if let Some(other) = suggestion {
                    let _ = match source {
                        DeviceSource::Preferences => writeln!(
                            out,
                            "Your preferences told me to look for {}, but maybe you meant to go with \
                             your {}? That one seems plugged in just fine. You can change your \
                             preferences by running me with the -w flag.\n",
                            wanted.nickname_determiner, other.nickname
                        ),
                        DeviceSource::CommandLine | DeviceSource::Wizard => writeln!(
                            out,
                            "I know you told me to search for {}, but maybe you meant to go with \
                             your {}? That one seems plugged in just fine.\n",
                            wanted.nickname_determiner, other.nickname
                        ),
                    };
                }
            }
            Self::UnknownVendor(vid) => {
                let _ = writeln!(out, "Vendor id {} is not in the list of supported boards:", vid);
                let _ = writeln!(out, "{}\n", registry::device_list());
            }
            Self::Enumeration(e) => {
                let _ = writeln!(out, "Listing serial ports failed: {}\n", e);
            }
        }
        out.push_str(
            "Please check your setup before trying again. You may find these commands helpful:\n   \
             serial-ws-bridge --list-ports\n   \
             ls -d /dev/ttyUSB*\n",
        );
        out
    }
}

/// Selects the serial port to bridge.
pub struct DeviceResolver {
    enumerator: Box<dyn PortEnumerator>,
    generic: Regex,
}

impl DeviceResolver {
    pub fn new(enumerator: Box<dyn PortEnumerator>) -> Self {
        Self {
            enumerator,
            generic: Regex::new(GENERIC_CONTROLLER_PATTERN)
                .expect("generic controller pattern is a valid regex"),
        }
    }

    /// Resolver over the operating system's port list.
    pub fn system() -> Self {
        Self::new(Box::new(SystemPorts))
    }

    /// All ports, in system order.
    pub fn available_ports(&self) -> Result<Vec<PortInfo>, ResolveError> {
        Ok(self.enumerator.available_ports()?)
    }

    /// Whether a port looks like a generic USB to serial converter.
    pub fn is_generic_controller(&self, port: &PortInfo) -> bool {
        port.haystacks().any(|text| self.generic.is_match(&text))
    }

    /// Find the port for `wanted`.
    ///
    /// 1. Exactly one generic controller: take it, regardless of vendor id.
    /// 2. Otherwise the first port, in enumeration order, whose vendor id
    ///    belongs to `wanted`.
    /// 3. Otherwise `NotFound`, suggesting a supported board that is plugged
    ///    in if there is one.
    pub fn find_port(&self, wanted: &'static Mcu) -> Result<Resolution, ResolveError> {
        let ports = self.enumerator.available_ports()?;

        let mut controllers = ports.iter().filter(|p| self.is_generic_controller(p));
        if let (Some(only), None) = (controllers.next(), controllers.next()) {
            info!(
                "Automatically found USB-Serial Controller: {}",
                only.description()
            );
            return Ok(Resolution {
                path: only.path.clone(),
                generic_controller: true,
            });
        }

        info!(
            "Found {} port(s), looking for vendor id(s) {:?}",
            ports.len(),
            wanted.vendor_ids
        );

        for (i, port) in ports.iter().enumerate() {
            debug!("   {}: {} (Vendor ID: {:?})", i, port, port.vid);
            if port.vid.is_some_and(|vid| wanted.matches(vid)) {
                info!("Found it! USB-Serial Controller: Device {}", i);
                return Ok(Resolution {
                    path: port.path.clone(),
                    generic_controller: false,
                });
            }
        }

        let suggestion = ports
            .iter()
            .filter_map(|p| p.vid)
            .find_map(registry::by_vendor_id);

        Err(ResolveError::NotFound {
            wanted,
            candidates: ports,
            suggestion,
        })
    }

    /// Find the port for the registry board owning `vid`.
    pub fn find_port_by_vendor_id(&self, vid: u16) -> Result<Resolution, ResolveError> {
        let wanted = registry::by_vendor_id(vid).ok_or(ResolveError::UnknownVendor(vid))?;
        self.find_port(wanted)
    }
}

impl std::fmt::Debug for DeviceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceResolver")
            .field("generic", &self.generic.as_str())
            .finish()
    }
}

/// Registry board, if any, owning a port's vendor id.
pub fn supported_board(port: &PortInfo) -> Option<&'static Mcu> {
    port.vid.and_then(registry::by_vendor_id)
}
