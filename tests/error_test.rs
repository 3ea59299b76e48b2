use std::io;

use pathtrees::PathtreesError;

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err: PathtreesError = io_err.into();
    assert!(matches!(err, PathtreesError::IoError(_)));

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: PathtreesError = json_err.into();
    assert!(matches!(err, PathtreesError::JsonError(_)));
}

#[test]
fn test_error_display() {
    let err = PathtreesError::MissingKey {
        target: "'plot' (logs/{log_id}/{plot_name}.png)".to_string(),
        keys: vec!["log_id".to_string(), "plot_name".to_string()],
    };
    assert_eq!(
        err.to_string(),
        "Missing value for log_id, plot_name in 'plot' (logs/{log_id}/{plot_name}.png)."
    );

    let err = PathtreesError::NoSuchPath("plot".to_string());
    assert_eq!(err.to_string(), "No such path: 'plot'.");

    let err = PathtreesError::DuplicateName("meta".to_string());
    assert_eq!(err.to_string(), "Duplicate path name: 'meta'.");
}

#[test]
fn test_errors_from_operations() {
    let err = pathtrees::Template::new("logs/{log_id").unwrap_err();
    assert!(err.to_string().starts_with("Invalid template 'logs/{log_id':"));

    let template = pathtrees::Template::new("logs/{log_id}.txt").unwrap();
    let err = template.parse("other/1.txt").unwrap_err();
    assert!(err.to_string().starts_with("Could not parse 'other/1.txt' using 'logs/{log_id}.txt':"));
}
