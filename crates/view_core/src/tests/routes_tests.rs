use super::*;

#[test]
fn trailing_slash_is_trimmed_from_the_base() {
    let routes = ApiRoutes::new("http://server.test/api/v3/").unwrap();
    assert_eq!(routes.views(), "http://server.test/api/v3/views");
}

#[test]
fn operation_paths_interpolate_identifiers() {
    let routes = ApiRoutes::new("http://server.test/api/v3").unwrap();
    assert_eq!(
        routes.views_for_project(ProjectId(12)),
        "http://server.test/api/v3/views?projectId=12"
    );
    assert_eq!(
        routes.distinct_value(ViewId(4)),
        "http://server.test/api/v3/views/4/distinct_value"
    );
    assert_eq!(
        routes.resultset(ViewId(4), 1),
        "http://server.test/api/v3/views/4/resultset?limit=1"
    );
    assert_eq!(
        routes.database(SourceId(9)),
        "http://server.test/api/v3/views/database?sourceId=9"
    );
    assert_eq!(
        routes.org_teams(OrgId(7)),
        "http://server.test/api/v3/organizations/7/teams"
    );
}

#[test]
fn non_http_bases_are_rejected() {
    assert!(matches!(
        ApiRoutes::new("ftp://server.test"),
        Err(CoreError::Config(_))
    ));
    assert!(matches!(
        ApiRoutes::new("not a url"),
        Err(CoreError::Config(_))
    ));
}
