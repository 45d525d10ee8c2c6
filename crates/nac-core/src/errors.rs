/// Core error type for the console.
///
/// The adapter crate maps transport-level failures into this type so the
/// application layer can handle them consistently (inline validation vs
/// retryable network vs remote-reported failure).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Local, field-level failure. Never reaches the network layer.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Transport or timeout failure. The triggering action stays retryable.
    #[error("network error: {0}")]
    Network(String),

    /// Remote-reported business failure, message taken from the envelope.
    #[error("{0}")]
    Api(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Field-level validation failures with the operator-facing message each
/// form shows inline.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a medium (SMS or WhatsApp)")]
    MissingChannel,

    #[error("Please select a project")]
    MissingProject,

    #[error("Mobile number is required")]
    MissingMobile,

    #[error("Message is required for SMS")]
    MissingMessage,

    #[error("Message exceeds 160 characters ({0})")]
    MessageTooLong(usize),

    #[error("Purpose is required for WhatsApp")]
    MissingPurpose,

    #[error("{0} is required")]
    MissingVariable(String),

    #[error("{0} must be a number")]
    InvalidVariableType(String),

    #[error("Please select a client")]
    MissingClient,

    #[error("Please select at least one membership type")]
    NoChannelSelected,

    #[error("Please select at least one plan")]
    NoPlanSelected,

    #[error("Project name is required")]
    MissingProjectName,

    #[error("Please select at least one medium (SMS or WhatsApp)")]
    NoMediumSelected,

    #[error("Phone Number ID is required for WhatsApp")]
    MissingPhoneNumberId,

    #[error("Access Token is required for WhatsApp")]
    MissingAccessToken,

    #[error("Template name is required")]
    MissingTemplateName,

    #[error("Template content is required")]
    MissingTemplateContent,

    #[error("Please select a template type")]
    MissingPurposeType,

    #[error("Please select at least one sender")]
    NoSenderSelected,

    #[error("Complete the remaining steps first")]
    SubmitTooEarly,

    #[error("A request is already in progress")]
    SubmitInFlight,
}
