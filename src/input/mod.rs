pub mod capture;
pub mod layers;

pub use capture::{LinkLayer, PacketSource, PcapSource};
pub use layers::{udp_payload, UdpPayload};
