use bale_graph::{TransformError, TransformInput, TransformOutput};

pub(super) fn transform(input: &TransformInput<'_>) -> Result<TransformOutput, TransformError> {
    let text = input.text()?;
    let value: serde_json::Value = serde_json::from_str(text).map_err(|err| {
        TransformError::new(format!("Invalid JSON: {}", err)).at(err.line() as u32, err.column() as u32)
    })?;

    Ok(TransformOutput {
        code: format!("module.exports = {value};"),
        ..TransformOutput::default()
    })
}

/// `?raw` imports export the file text as a string.
pub(super) fn raw(input: &TransformInput<'_>) -> Result<TransformOutput, TransformError> {
    let text = input.text()?;
    Ok(TransformOutput {
        code: format!(
            "module.exports = {};",
            serde_json::Value::String(text.to_string())
        ),
        ..TransformOutput::default()
    })
}

#[cfg(test)]
mod tests {
    use crate::transforms::test_support::{run, settings};

    #[test]
    fn json_keeps_key_order() {
        let output = run(&settings(), "data/menu.json", "{ \"b\": 1, \"a\": [true, null] }").unwrap();
        assert_eq!(output.code, "module.exports = {\"b\":1,\"a\":[true,null]};");
        assert!(output.dependencies.is_empty());
    }

    #[test]
    fn invalid_json_reports_position() {
        let err = run(&settings(), "data/bad.json", "{\n  \"a\": ,\n}").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(err.message.starts_with("Invalid JSON"));
    }
}
