// 1. Traits
pub use crate::agent::Agent;
pub use crate::data::state::StateEncoder;
pub use crate::notify::Notifier;

// 2. The Core "Loop" Types
pub use crate::gym::{
    Action, Reward, SkipReason, StepOutcome, Transition,
    eval::{EvalHistoryPolicy, EvaluationResult, TradeLabel, TradeRecord, evaluate},
    ledger::{PositionLedger, PositionLimit},
    run::{RunPhase, RunSummary, Runner},
    simulator::{EpisodeSimulator, Mode, StepRecord},
    train::{EpisodeResult, train_episode},
};

// 3. Market Data
pub use crate::data::{
    domain::{Price, StockId},
    loader::{load_adj_close, load_column},
    series::PriceSeries,
    state::{SigmoidWindowEncoder, State},
};

// 4. Agents
pub use crate::agent::{
    AgentIdentifier,
    dqn::{DqnAgent, DqnParams, Strategy},
};

// 5. Errors
pub use crate::error::{
    AgentError, DataError, IoError, SimError, TraderError, TraderResult,
};

// 6. Configs & Ports
pub use crate::config::TrainConfig;
pub use crate::io::SerdeFormat;
pub use crate::notify::{LogNotifier, Notification, OutboxNotifier};
