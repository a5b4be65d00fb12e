use crate::shell::scheduler::SharedHealth;

#[derive(Clone, Default)]
pub struct AppState {
    pub health: SharedHealth,
}
