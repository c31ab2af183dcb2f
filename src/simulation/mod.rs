pub mod config;
pub mod pipeline;
pub mod types;

pub use config::SimulationConfig;
pub use pipeline::SimulationProcess;
pub use types::{
    MarketScenario, PricingResult, RiskResult, SimulationOutput, VarianceReduction, Volatility,
};
