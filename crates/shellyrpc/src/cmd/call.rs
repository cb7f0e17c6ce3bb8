use serde_json::Value;

use crate::cmd::{with_client, CallArgs, DeviceArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_result, OutputFormat};

pub fn run(args: CallArgs, device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    let params = parse_params(args.params.as_deref())?;
    let method = args.method;

    let frame = with_client(device, |client| async move {
        let result = client
            .call_raw(&method, params)
            .await
            .map_err(|err| session_error(&format!("{method} failed"), err));
        (client, result)
    })?;

    print_result(&frame, format);
    Ok(SUCCESS)
}

fn parse_params(input: Option<&str>) -> CliResult<Option<Value>> {
    let Some(input) = input else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(input)
        .map_err(|err| CliError::new(USAGE, format!("--params is not valid JSON: {err}")))?;
    if !value.is_object() {
        return Err(CliError::new(USAGE, "--params must be a JSON object"));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_must_be_an_object() {
        assert_eq!(parse_params(None).unwrap(), None);
        assert_eq!(
            parse_params(Some(r#"{"id":0,"on":true}"#)).unwrap(),
            Some(serde_json::json!({"id": 0, "on": true}))
        );
        assert_eq!(parse_params(Some("[1,2]")).unwrap_err().code, USAGE);
        assert_eq!(parse_params(Some("{oops")).unwrap_err().code, USAGE);
    }
}
