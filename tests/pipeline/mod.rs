mod tests_staleness;
