pub mod check;
pub mod contact;
pub mod state;

pub use check::CheckRepository;
pub use contact::ContactRepository;
pub use state::{StateMachine, StateUpdate};
