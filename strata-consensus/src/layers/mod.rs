//! As camadas da pilha, do link perfeito até o consenso uniforme.

pub mod app;
pub mod beb;
pub mod ec;
pub mod eld;
pub mod ep;
pub mod epfd;
pub mod pl;
pub mod uc;

use strata_common::Message;

use crate::effects::Context;

pub use app::App;
pub use beb::BestEffortBroadcast;
pub use ec::EpochChange;
pub use eld::EventualLeaderDetector;
pub use ep::EpochConsensus;
pub use epfd::EventuallyPerfectFailureDetector;
pub use pl::PerfectLink;
pub use uc::UniformConsensus;

/// Closed set of layers an instance can host.
#[derive(Debug)]
pub enum Layer {
    App(App),
    PerfectLink(PerfectLink),
    Beb(BestEffortBroadcast),
    Epfd(EventuallyPerfectFailureDetector),
    Eld(EventualLeaderDetector),
    EpochChange(EpochChange),
    EpochConsensus(EpochConsensus),
    UniformConsensus(UniformConsensus),
}

impl Layer {
    /// Offers `message` to the layer. `true` means the layer consumed it.
    pub fn handle(&mut self, message: &Message, ctx: &mut Context<'_>) -> bool {
        match self {
            Layer::App(l) => l.handle(message, ctx),
            Layer::PerfectLink(l) => l.handle(message, ctx),
            Layer::Beb(l) => l.handle(message, ctx),
            Layer::Epfd(l) => l.handle(message, ctx),
            Layer::Eld(l) => l.handle(message, ctx),
            Layer::EpochChange(l) => l.handle(message, ctx),
            Layer::EpochConsensus(l) => l.handle(message, ctx),
            Layer::UniformConsensus(l) => l.handle(message, ctx),
        }
    }

    /// Runs once, right after the layer is registered.
    pub fn on_start(&mut self, ctx: &mut Context<'_>) {
        match self {
            Layer::Epfd(l) => l.on_start(ctx),
            Layer::Eld(l) => l.on_start(ctx),
            Layer::UniformConsensus(l) => l.on_start(ctx),
            _ => {}
        }
    }

    pub fn name(&self) -> String {
        match self {
            Layer::App(_) => "app".to_string(),
            Layer::PerfectLink(_) => "pl".to_string(),
            Layer::Beb(_) => "beb".to_string(),
            Layer::Epfd(_) => "epfd".to_string(),
            Layer::Eld(_) => "eld".to_string(),
            Layer::EpochChange(_) => "ec".to_string(),
            Layer::EpochConsensus(l) => l.id().to_string(),
            Layer::UniformConsensus(_) => "uc".to_string(),
        }
    }
}
