//! Operator-facing output: banners and the presenter seam.

pub mod banner;
pub mod terminal;

use crate::hitl::dispatch::Effect;
use banner::Banner;

pub use terminal::TerminalPresenter;

/// Renders HITL view effects and banners.
///
/// Called from the driver task only, one effect at a time and in order.
/// `Effect::Notify` and `Effect::SendResponse` never reach a presenter:
/// the driver turns the former into a [`Banner`] and executes the latter.
pub trait Presenter: Send + Sync {
    fn render(&self, effect: &Effect);

    fn banner_shown(&self, banner: &Banner);

    /// A banner left the board: it expired, was closed by the operator,
    /// or its request was resolved.
    fn banner_removed(&self, _banner_id: u64) {}
}
