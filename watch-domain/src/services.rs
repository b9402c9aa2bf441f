// Domain services: clock arithmetic, snapshot diffing and alert evaluation
pub mod alert_evaluator;
pub mod clock;
pub mod mob_list;

pub use alert_evaluator::*;
pub use clock::*;
pub use mob_list::*;
