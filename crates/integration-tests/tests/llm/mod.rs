mod anthropic;
mod errors;
mod openrouter;
mod routing;
