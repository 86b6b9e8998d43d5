use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillError {
    #[error("no primary calendar found for user {0}")]
    CalendarNotFound(String),
    #[error("no google calendar integration with a client type for user {0}")]
    CalendarIntegrationNotFound(String),
    #[error("no earlier question to answer, conversation has no prior exchange")]
    MissingPriorExchange,
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl SkillError {
    /// Errors that end the conversation instead of failing the turn.
    pub fn is_event_not_found(&self) -> bool {
        matches!(
            self,
            SkillError::CalendarNotFound(_) | SkillError::CalendarIntegrationNotFound(_)
        )
    }
}
