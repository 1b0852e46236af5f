pub mod blend;
pub mod engine;
pub mod growth;
pub mod methods;
pub mod ratios;
pub mod synthesis;
pub mod weights;
