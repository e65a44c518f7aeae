use dogma_contract::{
    parse_document, DuplicatePolicy, ExtractError, Extractor, Field, Schema, TypeDefinition, Verb,
};
use dogma_markdown::parse_sections;
use dogma_test_support::{settings_with_duplicates, test_config, USERS_CONTRACT};
use pretty_assertions::assert_eq;

fn field(name: &str, ty: &str, description: &str, required: bool) -> Field {
    Field {
        name: name.into(),
        ty: ty.into(),
        description: description.into(),
        required,
    }
}

#[test]
fn extracts_endpoints_in_document_order() {
    let contract = parse_document(USERS_CONTRACT).expect("extract contract");

    let names: Vec<_> = contract.endpoints.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["users/{id}", "users"]);

    let get_user = contract.endpoint("users/{id}").expect("users/{id}");
    assert_eq!(get_user.verb, Verb::Get);
    assert_eq!(get_user.path(), "/users/{id}");
    assert_eq!(
        get_user.url_params.fields(),
        &[field("id", "string", "user identifier", true)]
    );
    assert!(get_user.body.is_empty());
    assert_eq!(
        get_user.result.fields(),
        &[field("user", "User", "the user", true)]
    );

    let create_user = contract.endpoint("users").expect("users");
    assert_eq!(create_user.verb, Verb::Post);
    assert_eq!(
        create_user.body.fields(),
        &[
            field("name", "string", "", true),
            field("email", "string", "", false)
        ]
    );
    assert_eq!(
        create_user.result,
        Schema::Raw {
            language: Some("json".into()),
            text: "{ \"id\": \"string\" }\n".into(),
        }
    );
}

#[test]
fn extracts_types_by_name() {
    let contract = parse_document(USERS_CONTRACT).expect("extract contract");

    let names: Vec<_> = contract.types.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Role", "Token", "User"]);

    assert_eq!(
        contract.types["User"].definition,
        TypeDefinition::Fields {
            fields: vec![
                field("id", "string", "identifier", true),
                field("name", "string", "display name", true),
            ]
        }
    );
    assert_eq!(
        contract.types["Role"].definition,
        TypeDefinition::Raw {
            language: Some("ts".into()),
            text: "type Role = \"admin\" | \"member\";\n".into(),
        }
    );
    assert_eq!(
        contract.types["Token"].definition,
        TypeDefinition::Raw {
            language: None,
            text: "An opaque bearer token string.".into(),
        }
    );
}

#[test]
fn front_matter_is_carried_on_the_contract() {
    let contract = parse_document(USERS_CONTRACT).expect("extract contract");
    assert_eq!(
        contract.front_matter.get("title").map(String::as_str),
        Some("Users service")
    );
    assert!(contract.diagnostics.is_empty());
}

#[test]
fn tree_level_entry_points_agree_with_parse_document() {
    let extractor = Extractor::from_config(&test_config());
    let root = parse_sections(USERS_CONTRACT);

    let endpoints = extractor
        .extract_endpoints(&root, USERS_CONTRACT)
        .expect("endpoints");
    let types = extractor.extract_types(&root, USERS_CONTRACT).expect("types");
    let contract = extractor.parse_document(USERS_CONTRACT).expect("contract");

    assert_eq!(endpoints, contract.endpoints);
    assert_eq!(types, contract.types);
}

#[test]
fn api_section_may_be_nested_under_a_title() {
    let source = "# Billing\n\n## REST API\n\n### invoices\n\nMethod: get\n";
    let contract = parse_document(source).expect("extract");
    assert_eq!(contract.endpoints.len(), 1);
    assert_eq!(contract.endpoints[0].name, "invoices");
    assert_eq!(contract.endpoints[0].verb, Verb::Get);
}

#[test]
fn documents_without_contract_sections_yield_nothing() {
    let contract = parse_document("# Readme\n\nJust prose.\n").expect("extract");
    assert!(contract.endpoints.is_empty());
    assert!(contract.types.is_empty());
}

#[test]
fn missing_method_is_reported_with_line() {
    let source = "# API\n\n## ping\n\nNo method here.\n";
    let err = parse_document(source).expect_err("missing method");
    assert_eq!(
        err,
        ExtractError::MissingVerb {
            endpoint: "ping".into(),
            line: 3,
        }
    );
    assert_eq!(err.to_string(), "line 3: endpoint 'ping' has no `Method:` line");
}

#[test]
fn unsupported_method_is_an_extraction_error() {
    let source = "# API\n\n## ping\n\nMethod: OPTIONS\n";
    let err = parse_document(source).expect_err("unsupported method");
    assert!(matches!(err, ExtractError::UnsupportedVerb { ref verb, .. } if verb == "OPTIONS"));
}

#[test]
fn table_without_type_column_is_malformed() {
    let source = "# Types\n\n## User\n\n| Name | Kind |\n| --- | --- |\n| id | x |\n";
    let err = parse_document(source).expect_err("malformed table");
    assert!(matches!(
        err,
        ExtractError::MalformedTable { ref section, line: 3, .. } if section == "User"
    ));
}

#[test]
fn empty_type_is_rejected() {
    let err = parse_document("# Types\n\n## Nothing\n\n# Other\n").expect_err("empty type");
    assert_eq!(
        err,
        ExtractError::EmptyType {
            name: "Nothing".into(),
            line: 3,
        }
    );
}

const DUPLICATED: &str = "# API\n\n## ping\n\nMethod: GET\n\n## ping\n\nMethod: GET\n\n\
### Result\n\n```json\n{}\n```\n";

#[test]
fn duplicate_endpoints_fail_by_default() {
    let err = parse_document(DUPLICATED).expect_err("duplicate");
    assert_eq!(
        err,
        ExtractError::DuplicateEndpoint {
            name: "ping".into(),
            verb: Verb::Get,
            line: 7,
            first_line: 3,
        }
    );
    assert_eq!(
        err.to_string(),
        "line 7: endpoint 'ping' (GET) is already defined at line 3"
    );
}

#[test]
fn duplicate_policy_picks_a_winner_and_reports_it() {
    let first = Extractor::new(settings_with_duplicates(DuplicatePolicy::FirstWins))
        .parse_document(DUPLICATED)
        .expect("first wins");
    assert_eq!(first.endpoints.len(), 1);
    assert_eq!(first.endpoints[0].result, Schema::Empty);
    assert_eq!(first.diagnostics.len(), 1);
    assert_eq!(first.diagnostics[0].line, 7);
    assert_eq!(
        first.diagnostics[0].message,
        "endpoint 'ping' (GET) is already defined at line 3"
    );

    let last = Extractor::new(settings_with_duplicates(DuplicatePolicy::LastWins))
        .parse_document(DUPLICATED)
        .expect("last wins");
    assert_eq!(last.endpoints.len(), 1);
    assert!(matches!(last.endpoints[0].result, Schema::Raw { .. }));
    assert_eq!(last.diagnostics.len(), 1);
}

#[test]
fn same_name_with_different_methods_is_two_endpoints() {
    let source = "# API\n\n## ping\n\nMethod: GET\n\n## ping\n\nMethod: POST\n";
    let contract = parse_document(source).expect("distinct methods");
    let verbs: Vec<&Verb> = contract.endpoints.iter().map(|e| &e.verb).collect();
    assert_eq!(verbs, [&Verb::Get, &Verb::Post]);
    assert!(contract.diagnostics.is_empty());
}

#[test]
fn duplicate_types_follow_the_same_policy() {
    let source = "# Types\n\n## Id\n\nfirst\n\n## Id\n\nsecond\n";
    assert!(matches!(
        parse_document(source),
        Err(ExtractError::DuplicateType { .. })
    ));

    let last = Extractor::new(settings_with_duplicates(DuplicatePolicy::LastWins))
        .parse_document(source)
        .expect("last wins");
    assert_eq!(
        last.types["Id"].definition,
        TypeDefinition::Raw {
            language: None,
            text: "second".into(),
        }
    );
}

#[test]
fn contract_serializes_with_method_key() {
    let contract = parse_document(USERS_CONTRACT).expect("extract contract");
    let json = serde_json::to_value(&contract.endpoints[0]).expect("serialize endpoint");
    assert_eq!(json["name"], "users/{id}");
    assert_eq!(json["method"], "GET");
    assert_eq!(json["url_params"]["kind"], "fields");
    assert!(json.get("body").is_none());
}
