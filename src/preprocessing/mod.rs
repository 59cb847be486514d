/// Text preprocessing for ticket sentiment classification
///
/// This module provides:
/// - The fixed cleaning pipeline applied to raw (HTML / e-mail) text
/// - Cutting text at greetings and sign-offs
/// - Removal of configured domain stop words

pub mod greetings;
pub mod stopwords;
pub mod text;

pub use greetings::GreetingFilter;
pub use stopwords::StopwordFilter;
pub use text::TextPreProcessor;
