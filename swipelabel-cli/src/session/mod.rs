//! Review session state machine.
//!
//! The client session is modelled as:
//! - **State**: where the reviewer is (`SessionState`)
//! - **Events**: what happened (`SessionEvent`)
//! - **Effects**: what to do next (`SessionEffect`)
//! - **Transition**: pure function `(State, Event) -> (State, Vec<Effect>)`
//!
//! `SessionDriver` executes effects against the API and the local cache and
//! feeds the resulting events back in.

pub mod effect;
pub mod event;
pub mod state;
pub mod transition;

pub use effect::*;
pub use event::*;
pub use state::*;
pub use transition::*;
