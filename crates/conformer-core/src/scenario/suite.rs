//! The base conformance suite every action runtime must pass

use serde_json::{json, Map, Value};

use super::{Expectation, Scenario, ScenarioConfig, StreamCheck, SuiteConfig};
use crate::core_types::EnvironmentSet;
use crate::errors::HarnessError;
use crate::protocol::{InitRequest, RunRequest, DEFAULT_ENTRY_POINT};

pub const MISSING_CODE_MESSAGE: &str = "Missing main/no code to execute.";
pub const NOT_A_DICTIONARY_MESSAGE: &str = "The action did not return a dictionary.";
pub const INIT_TWICE_MESSAGE: &str = "Cannot initialize the action more than once.";

/// Just under one mebibyte once wrapped in `{"arg": ...}`.
pub const LARGE_INPUT_LENGTH: usize = 1_048_561;

const SKIPPED_BY_CONFIG: &str = "skip_test is set for this runtime";

/// Builds the scenarios for one runtime, in a fixed order.
///
/// The two init-validation scenarios need no runtime data and are always
/// present; every other scenario is included only when `config` has an
/// entry for it.
pub fn base_suite(config: &SuiteConfig) -> Result<Vec<Scenario>, HarnessError> {
    let mut suite = vec![init_with_no_code(), init_with_no_content()];

    if let Some(c) = &config.not_returning_json {
        suite.push(not_returning_json(c));
    }
    if let Some(c) = &config.init_cannot_be_called_more_than_once {
        suite.push(init_cannot_be_called_more_than_once(c));
    }
    if let Some(c) = &config.entry_point_other_than_main {
        suite.push(entry_point_other_than_main(c)?);
    }
    if let Some(c) = &config.echo {
        suite.push(echo(c));
    }
    if let Some(c) = &config.unicode {
        suite.push(unicode(c));
    }
    if let Some(c) = &config.env_parameters {
        suite.push(env_parameters(c));
    }
    if let Some(c) = &config.env {
        suite.push(activation_context(c));
    }
    if let Some(c) = &config.large_input {
        suite.push(large_input(c));
    }
    Ok(suite)
}

fn init_request(config: &ScenarioConfig) -> InitRequest {
    InitRequest::new(config.code.clone()).with_main(config.main.clone())
}

fn with_empty_stream_checks(mut scenario: Scenario, config: &ScenarioConfig) -> Scenario {
    if config.enforce_empty_output_stream {
        scenario = scenario.check_streams(StreamCheck::StdoutEmpty);
    }
    if config.enforce_empty_error_stream {
        scenario = scenario.check_streams(StreamCheck::StderrEmpty);
    }
    scenario
}

fn init_with_no_code() -> Scenario {
    Scenario::new("init_with_no_code")
        .init(InitRequest::new("").with_main(""), Expectation::not_ok())
        .expect_sentinels(0)
}

fn init_with_no_content() -> Scenario {
    Scenario::new("init_with_no_content")
        .init_raw(
            json!({}),
            Expectation::not_ok().with_body(json!({ "error": MISSING_CODE_MESSAGE })),
        )
        .expect_sentinels(0)
}

fn not_returning_json(config: &ScenarioConfig) -> Scenario {
    let scenario = Scenario::new("not_returning_json")
        .init(init_request(config), Expectation::ok())
        .run(
            RunRequest::new(json!({})),
            Expectation::not_ok().with_body(json!({ "error": NOT_A_DICTIONARY_MESSAGE })),
        );
    with_empty_stream_checks(scenario, config)
}

fn init_cannot_be_called_more_than_once(config: &ScenarioConfig) -> Scenario {
    Scenario::new("init_cannot_be_called_more_than_once")
        .init(init_request(config), Expectation::ok())
        .init(
            init_request(config),
            Expectation::not_ok().with_body(json!({ "error": INIT_TWICE_MESSAGE })),
        )
        .expect_sentinels(0)
        .check_streams(StreamCheck::CombinedContains(INIT_TWICE_MESSAGE.to_string()))
}

fn entry_point_other_than_main(config: &ScenarioConfig) -> Result<Scenario, HarnessError> {
    if config.main == DEFAULT_ENTRY_POINT {
        return Err(HarnessError::Config(format!(
            "entry_point_other_than_main must name an entry point other than '{}'",
            DEFAULT_ENTRY_POINT
        )));
    }

    let input = json!({ "string": "hello" });
    let mut scenario = Scenario::new("entry_point_other_than_main")
        .init(init_request(config), Expectation::ok())
        .run(RunRequest::new(input.clone()), Expectation::ok().with_body(input));
    if config.enforce_empty_output_stream {
        scenario = scenario.check_streams(StreamCheck::StdoutEmpty);
    }
    Ok(scenario)
}

fn echo(config: &ScenarioConfig) -> Scenario {
    let inputs = [
        json!({ "string": "hello" }),
        json!({ "string": "❄ ☃ ❄" }),
        json!({ "numbers": [42, 1] }),
        json!({ "object": { "a": "A" } }),
    ];

    let mut scenario = Scenario::new("echo")
        .init(init_request(config), Expectation::ok())
        .expect_sentinels(inputs.len())
        .check_streams(StreamCheck::StdoutContains("hello stdout".to_string()));
    for input in inputs {
        scenario = scenario.run(RunRequest::new(input.clone()), Expectation::ok().with_body(input));
    }
    // Some runtimes have no way to write to stderr.
    if !config.skip_test {
        scenario = scenario.check_streams(StreamCheck::StderrContains("hello stderr".to_string()));
    }
    scenario
}

fn unicode(config: &ScenarioConfig) -> Scenario {
    Scenario::new("unicode")
        .init(init_request(config), Expectation::ok())
        .run(
            RunRequest::new(json!({ "delimiter": "❄" })),
            Expectation::ok().with_body(json!({ "winter": "❄ ☃ ❄" })),
        )
        .check_streams(StreamCheck::StdoutContainsIgnoreCase("❄ ☃ ❄".to_string()))
}

fn env_parameters(config: &ScenarioConfig) -> Scenario {
    let env = EnvironmentSet::new()
        .with("SOME_VAR", "xyz")
        .with("ANOTHER_VAR", "");
    let expected = json!({ "SOME_VAR": "xyz", "ANOTHER_VAR": "" });

    let scenario = Scenario::new("env_parameters")
        .init(init_request(config).with_env(env), Expectation::ok())
        .run(RunRequest::new(json!({})), Expectation::ok().with_body(expected));
    let scenario = with_empty_stream_checks(scenario, config);
    if config.skip_test {
        scenario.skipped(SKIPPED_BY_CONFIG)
    } else {
        scenario
    }
}

fn activation_context(config: &ScenarioConfig) -> Scenario {
    let props: Map<String, Value> = [
        ("api_key", "abc"),
        ("namespace", "zzz"),
        ("action_name", "xxx"),
        ("action_version", "0.0.1"),
        ("activation_id", "iii"),
        ("deadline", "123"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
    .collect();

    let mut expected = props.clone();
    expected.insert("api_host".to_string(), json!("xyz"));

    let scenario = Scenario::new("env")
        .with_container_env(EnvironmentSet::new().with("__OW_API_HOST", "xyz"))
        .init(init_request(config), Expectation::ok())
        .run(
            RunRequest::new(json!({})).with_properties(props),
            Expectation::ok().with_body(Value::Object(expected)),
        );
    with_empty_stream_checks(scenario, config)
}

fn large_input(config: &ScenarioConfig) -> Scenario {
    let input = json!({ "arg": "a".repeat(LARGE_INPUT_LENGTH) });
    let scenario = Scenario::new("large_input")
        .init(init_request(config), Expectation::ok())
        .run(RunRequest::new(input.clone()), Expectation::ok().with_body(input));
    if config.skip_test {
        scenario.skipped(SKIPPED_BY_CONFIG)
    } else {
        scenario
    }
}
