//! Exam session controller: catalog, clocks, gates, the speaking sequence
//! and the session that ties them together. Nothing in here touches the
//! terminal.

pub mod answers;
pub mod catalog;
pub mod devices;
pub mod gate;
pub mod navigator;
pub mod session;
pub mod skill;
pub mod speaking;
pub mod submission;
pub mod timer;

pub use catalog::{Catalog, CatalogError, Part, PartId};
pub use session::{AdvanceOutcome, ExamSession, NavigationError, PendingPrompt, SessionEvent};
pub use skill::Skill;
pub use submission::{SubmitTrigger, Submission};
pub use timer::SkillBudgets;
