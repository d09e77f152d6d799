//! The 802.11/EAPOL handshake reconstructor (component G, §4.7) and the
//! AP/Station arena it's built on (component G's data model, §3, §9).

pub mod ap;
pub mod frame;
pub mod parser;
pub mod pke;

pub use ap::{ApId, Arena, StaId};
pub use frame::{EapolKeyFrame, Frame, KeyInfo, Mac, ManagementKind};
pub use parser::{live_capture_filter, Authentication, NoopHooks, Parser, ParserHooks};
pub use pke::build_pke;
