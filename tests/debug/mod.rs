mod scripted;
mod tests_session;
