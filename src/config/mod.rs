mod settings;

pub use settings::{LoggingConfig, MailerConfig, QueueConfig, Settings};
