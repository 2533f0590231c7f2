//! Delivery-person client: session, order console and the availability &
//! location gate that drives background tracking.
pub mod api;
pub mod console;
pub mod error;
pub mod gate;
pub mod location;
pub mod session;

pub use api::{DeliveryApi, HttpApi, ProofImage};
pub use console::{OrderAction, OrderConsole, StatusFilter};
pub use error::ClientError;
pub use gate::{GateCadence, GateHandle, GateState, LocationGate};
pub use location::{LocationProvider, StaticLocation};
pub use session::Session;
