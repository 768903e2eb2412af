pub mod dispatch;
pub mod janitor;
pub mod offers;
pub mod queue;
pub mod selection;
pub mod watchdog;
