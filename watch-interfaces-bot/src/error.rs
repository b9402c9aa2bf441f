use watch_application::AppError;

pub const GENERIC_FAILURE_REPLY: &str = "Something went wrong, please try again later.";

/// Chat-facing text for a failed command. Internal details stay in the logs.
pub fn error_reply(err: &AppError) -> String {
    match err {
        AppError::Domain(_) | AppError::Internal(_) => GENERIC_FAILURE_REPLY.to_string(),
    }
}
