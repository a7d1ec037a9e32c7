use statement_merge::{load_sources, LoadError, MergeConfig, Pipeline, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BANK1: &str = "timestamp,type,amount,from,to\n\
                     2019-10-01T12:15:00,add,99.20,198,182\n";
const BANK2: &str = "date,transaction,cents,to,from\n\
                     2019-10-03,remove,1250,182,198\n";

async fn serve(files: &[(&str, &str)]) -> MockServer {
    let server = MockServer::start().await;
    for (name, body) in files {
        Mock::given(method("GET"))
            .and(path(format!("/raw/{}", name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(*body))
            .mount(&server)
            .await;
    }
    server
}

// reqwest::blocking must not run on the async executor threads
#[tokio::test(flavor = "multi_thread")]
async fn test_load_remote_sources_keyed_by_last_segment() {
    let server = serve(&[("bank1.csv", BANK1), ("bank2.csv", BANK2)]).await;
    let urls = vec![
        format!("{}/raw/bank1.csv", server.uri()),
        format!("{}/raw/bank2.csv", server.uri()),
    ];

    let tables = tokio::task::spawn_blocking(move || load_sources(&urls))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].source, "bank1.csv");
    assert_eq!(tables[1].source, "bank2.csv");
    assert_eq!(tables[1].value(0, "cents"), Some(&Value::Integer(1250)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_not_found_is_load_error() {
    let server = serve(&[("bank1.csv", BANK1)]).await;
    let urls = vec![
        format!("{}/raw/bank1.csv", server.uri()),
        format!("{}/raw/missing.csv", server.uri()),
    ];

    let result = tokio::task::spawn_blocking(move || load_sources(&urls))
        .await
        .unwrap();

    match result {
        Err(LoadError::Fetch { location, .. }) => assert!(location.ends_with("/raw/missing.csv")),
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pipeline_run_over_http() {
    let server = serve(&[("bank1.csv", BANK1), ("bank2.csv", BANK2)]).await;
    let urls = vec![
        format!("{}/raw/bank1.csv", server.uri()),
        format!("{}/raw/bank2.csv", server.uri()),
    ];
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("unified_csv.csv");
    let config = MergeConfig::default().with_output(&output);

    let (outcome_ok, written, xml) = tokio::task::spawn_blocking(move || {
        let mut pipeline = Pipeline::new(config);
        let outcome = pipeline.run(&urls);
        let written = std::fs::read_to_string(&output).unwrap_or_default();
        (outcome.is_success(), written, pipeline.convert_result_to("xml"))
    })
    .await
    .unwrap();

    assert!(outcome_ok);
    assert_eq!(
        written,
        "date/timestamp,transaction_type,amount,from,to\n\
         2019-10-01T12:15:00,add,99.2,198,182\n\
         2019-10-03,remove,12.5,198,182\n"
    );
    assert_eq!(xml.matches("<item>").count(), 2);
}
