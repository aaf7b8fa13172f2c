pub mod session;

pub use session::{AnswerOutcome, AnswerPolicy, SessionState};
