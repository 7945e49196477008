use super::*;

#[test]
fn parse_method_is_case_insensitive() {
    assert_eq!(parse_method("get").unwrap(), Method::GET);
    assert_eq!(parse_method("Patch").unwrap(), Method::PATCH);
    assert_eq!(parse_method("DELETE").unwrap(), Method::DELETE);
}

#[test]
fn parse_method_rejects_garbage() {
    assert!(matches!(parse_method("no such"), Err(CliError::InvalidMethod(_))));
}

#[test]
fn cli_parses_login() {
    let cli = Cli::try_parse_from(["campscout-cli", "login", "--email", "a@b.com", "--password", "secret"]).unwrap();
    assert!(matches!(cli.command, Command::Login { ref email, ref password } if email == "a@b.com" && password == "secret"));
}

#[test]
fn cli_parses_api_with_data() {
    let cli = Cli::try_parse_from([
        "campscout-cli",
        "--api-url",
        "https://api.campscout.test",
        "api",
        "post",
        "/api/campgrounds/232447/alerts",
        "--data",
        r#"{"party_size":2}"#,
    ])
    .unwrap();
    assert_eq!(cli.api_url.as_deref(), Some("https://api.campscout.test"));
    assert!(matches!(cli.command, Command::Api { ref method, ref data, .. } if method == "post" && data.is_some()));
}

#[test]
fn cli_requires_subcommand() {
    assert!(Cli::try_parse_from(["campscout-cli"]).is_err());
}

#[test]
fn cli_parses_search_with_rec_areas() {
    let cli = Cli::try_parse_from([
        "campscout-cli",
        "search",
        "Yosemite",
        "--start-date",
        "2025-07-01",
        "--rec-area",
        "2991",
        "--rec-area",
        "2725",
    ])
    .unwrap();
    let Command::Search { location, start_date, nights, limit, rec_area_id, .. } = cli.command else {
        panic!("expected search");
    };
    assert_eq!(location.as_deref(), Some("Yosemite"));
    assert_eq!(start_date.as_deref(), Some("2025-07-01"));
    assert_eq!(nights, 1);
    assert_eq!(limit, 20);
    assert_eq!(rec_area_id, vec!["2991", "2725"]);
}

#[test]
fn cli_parses_alert_create_defaults() {
    let cli = Cli::try_parse_from([
        "campscout-cli",
        "alerts",
        "create",
        "232447",
        "--start-date",
        "2025-07-01",
        "--end-date",
        "2025-07-03",
    ])
    .unwrap();
    let Command::Alerts(AlertsCommand { command: AlertsSubcommand::Create { campground_id, site_type, party_size, .. } }) =
        cli.command
    else {
        panic!("expected alerts create");
    };
    assert_eq!(campground_id, "232447");
    assert_eq!(site_type, "any");
    assert_eq!(party_size, 1);
}

#[test]
fn cli_parses_alert_pause() {
    let cli = Cli::try_parse_from(["campscout-cli", "alerts", "update", "a-1", "--active", "false"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Alerts(AlertsCommand { command: AlertsSubcommand::Update { active: Some(false), .. } })
    ));
}

#[test]
fn cli_availability_requires_dates() {
    assert!(Cli::try_parse_from(["campscout-cli", "availability", "232447"]).is_err());
}
