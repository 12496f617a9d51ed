pub mod diff;
pub mod flatten;
pub mod localizer;
pub mod mask;
pub mod provider;
pub mod report;
pub mod scan;
pub mod store;
pub mod sync;
pub mod translate;
