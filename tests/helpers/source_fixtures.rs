//! Robot sources used across tests.

pub const GREET_RESOURCE: &str = "\
*** Keywords ***
Say Hello
    [Arguments]    ${name}=world
    Log    Hello ${name}
";

pub const GREET_SUITE: &str = "\
*** Settings ***
Resource    greet.resource

*** Test Cases ***
Greets
    Say Hello
    Say Hello    Robot
";

pub const ALIAS_SUITE: &str = "\
*** Settings ***
Library    Collections    WITH NAME    Col

*** Test Cases ***
Lists
    Col.
";

pub const SHADOW_RESOURCE: &str = "\
*** Variables ***
${SHARED}    from resource

*** Keywords ***
Shared
    No Operation
";

pub const SHADOW_SUITE: &str = "\
*** Settings ***
Resource    shadow.resource

*** Variables ***
${SHARED}    from suite

*** Test Cases ***
Uses Local
    Shared

*** Keywords ***
Shared
    Log    local
";

pub const MY_LIB: &str = "\
def greet_user(name):
    pass


def _helper():
    pass
";
