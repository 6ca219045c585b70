//! Domain constants.

/// Extensions of files parsed as suites or resources.
pub const ROBOT_EXTENSIONS: &[&str] = &[".robot", ".resource"];

/// Extensions accepted for `Resource` imports.
pub const RESOURCE_EXTENSIONS: &[&str] = &[".robot", ".resource", ".txt", ".tsv", ".rst"];

/// Extensions that mark a `Library` import as path-based.
pub const PATH_LIBRARY_EXTENSIONS: &[&str] = &[".py", ".java", ".class"];

/// Extensions accepted for `Variables` imports.
pub const VARIABLE_FILE_EXTENSIONS: &[&str] = &[".py", ".yaml", ".yml", ".json"];

/// Library that is implicitly imported by every suite.
pub const BUILTIN_LIBRARY: &str = "BuiltIn";

/// Behaviour-driven prefixes stripped from keyword calls (matched case-insensitively).
pub const GHERKIN_PREFIXES: &[&str] = &["given", "when", "then", "and", "but"];

/// Variables every execution provides.
pub const BUILTIN_VARIABLES: &[(&str, &str)] = &[
    ("${CURDIR}", "Directory of the current file"),
    ("${TEMPDIR}", "System temporary directory"),
    ("${EXECDIR}", "Directory where execution started"),
    ("${/}", "Path separator"),
    ("${:}", "Path list separator"),
    ("${\\n}", "Line separator"),
    ("${SPACE}", "A single space"),
    ("${EMPTY}", "Empty string"),
    ("@{EMPTY}", "Empty list"),
    ("&{EMPTY}", "Empty dictionary"),
    ("${True}", "Boolean true"),
    ("${False}", "Boolean false"),
    ("${None}", "Python None"),
    ("${null}", "Python None"),
    ("${TEST NAME}", "Name of the current test"),
    ("@{TEST TAGS}", "Tags of the current test"),
    ("${TEST DOCUMENTATION}", "Documentation of the current test"),
    ("${TEST STATUS}", "Status of the current test"),
    ("${TEST MESSAGE}", "Message of the current test"),
    ("${PREV TEST NAME}", "Name of the previous test"),
    ("${PREV TEST STATUS}", "Status of the previous test"),
    ("${PREV TEST MESSAGE}", "Message of the previous test"),
    ("${SUITE NAME}", "Full name of the current suite"),
    ("${SUITE SOURCE}", "Path of the suite source"),
    ("${SUITE DOCUMENTATION}", "Documentation of the current suite"),
    ("&{SUITE METADATA}", "Metadata of the current suite"),
    ("${SUITE STATUS}", "Status of the current suite"),
    ("${SUITE MESSAGE}", "Message of the current suite"),
    ("${KEYWORD STATUS}", "Status of the current keyword"),
    ("${KEYWORD MESSAGE}", "Message of the current keyword"),
    ("${LOG LEVEL}", "Current log level"),
    ("${OUTPUT DIR}", "Output directory"),
    ("${OUTPUT FILE}", "Output file"),
    ("${LOG FILE}", "Log file"),
    ("${REPORT FILE}", "Report file"),
    ("${DEBUG FILE}", "Debug file"),
    ("&{OPTIONS}", "Execution options"),
];

/// Run-keyword variants: keyword name → index of the argument holding the
/// keyword to run.
pub const RUN_KEYWORD_VARIANTS: &[(&str, usize)] = &[
    ("Run Keyword", 0),
    ("Run Keyword And Continue On Failure", 0),
    ("Run Keyword And Ignore Error", 0),
    ("Run Keyword And Return", 0),
    ("Run Keyword And Return Status", 0),
    ("Run Keyword And Warn On Failure", 0),
    ("Run Keyword And Expect Error", 1),
    ("Run Keyword And Return If", 1),
    ("Run Keyword If", 1),
    ("Run Keyword Unless", 1),
    ("Run Keyword If All Tests Passed", 0),
    ("Run Keyword If Any Tests Failed", 0),
    ("Run Keyword If Test Failed", 0),
    ("Run Keyword If Test Passed", 0),
    ("Run Keyword If Timeout Occurred", 0),
    ("Repeat Keyword", 1),
    ("Wait Until Keyword Succeeds", 2),
];

/// Setting names valid in a `*** Settings ***` section.
pub const SETTING_NAMES: &[&str] = &[
    "Library",
    "Resource",
    "Variables",
    "Documentation",
    "Metadata",
    "Suite Setup",
    "Suite Teardown",
    "Test Setup",
    "Test Teardown",
    "Test Template",
    "Test Timeout",
    "Test Tags",
    "Force Tags",
    "Default Tags",
    "Task Setup",
    "Task Teardown",
    "Task Template",
    "Task Timeout",
    "Keyword Tags",
];

/// Section header names offered by completion.
pub const SECTION_HEADERS: &[&str] = &[
    "*** Settings ***",
    "*** Variables ***",
    "*** Test Cases ***",
    "*** Tasks ***",
    "*** Keywords ***",
    "*** Comments ***",
];
