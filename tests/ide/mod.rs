mod tests_completion;
mod tests_navigation;
