#[cfg(test)]
mod tests {
    use crate::adapter::{PlatformAdapter, PostingFields, RawDetail, RawListing, ScrapeLimits};
    use crate::platforms::{AshbyAdapter, GreenhouseAdapter, LeverAdapter, WorkableAdapter};
    use async_trait::async_trait;
    use jobscout_core::{AppConfig, JobPosting, Platform};
    use mockito::Matcher;
    use serde_json::json;
    use std::io::Write;
    use std::time::Duration;

    fn test_config(max_retries: u32) -> AppConfig {
        AppConfig {
            max_retries,
            detail_delay_ms: 0,
            request_timeout_secs: 5,
            ..Default::default()
        }
    }

    fn limits() -> ScrapeLimits {
        ScrapeLimits {
            worker_pool_size: 4,
            detail_concurrency: 2,
            detail_delay: Duration::ZERO,
        }
    }

    fn orgs(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn find<'a>(jobs: &'a [JobPosting], id: &str) -> &'a JobPosting {
        jobs.iter()
            .find(|job| job.id == id)
            .unwrap_or_else(|| panic!("no job {}", id))
    }

    #[tokio::test]
    async fn test_greenhouse_listing_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "jobs": [
                {
                    "id": 111,
                    "title": "Platform Engineer",
                    "absolute_url": "https://boards.greenhouse.io/acme/jobs/111",
                    "location": {"name": "Remote"},
                    "updated_at": "2024-03-02T09:00:00-05:00",
                    "first_published": "2024-03-01T09:00:00-05:00",
                    "content": "&lt;p&gt;Build the &lt;strong&gt;platform&lt;/strong&gt;&lt;/p&gt;"
                },
                {
                    "id": 222,
                    "title": "Senior Platform Engineer",
                    "absolute_url": "https://boards.greenhouse.io/acme/jobs/222",
                    "location": null,
                    "updated_at": "2024-03-02T12:00:00Z"
                }
            ]
        });
        let list = server
            .mock("GET", "/v1/boards/acme/jobs")
            .match_query(Matcher::UrlEncoded("content".into(), "true".into()))
            .with_status(200)
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await;

        let adapter = GreenhouseAdapter::new(&test_config(1), None)
            .unwrap()
            .with_base_url(server.url());
        let mut sink = Vec::new();
        adapter.scrape(&orgs(&["acme"]), &limits(), &mut sink).await;

        list.assert_async().await;
        assert_eq!(sink.len(), 2);

        let first = find(&sink, "111");
        assert_eq!(first.source, Platform::Greenhouse);
        assert_eq!(first.organization, "acme");
        assert_eq!(first.url, "https://boards.greenhouse.io/acme/jobs/111");
        assert_eq!(first.location_name, "Remote");
        assert_eq!(first.description, "Build the platform");
        assert_eq!(first.timestamp, "2024-03-01T14:00:00Z");

        let second = find(&sink, "222");
        assert_eq!(second.title, "Senior Platform Engineer");
        assert_eq!(second.location_name, "");
        assert_eq!(second.timestamp, "2024-03-02T12:00:00Z");
    }

    #[tokio::test]
    async fn test_failing_organization_does_not_sink_the_batch() {
        let mut server = mockito::Server::new_async().await;
        let down = server
            .mock("GET", "/v1/boards/acme/jobs")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        let missing = server
            .mock("GET", "/v1/boards/ghost/jobs")
            .match_query(Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let _other = server
            .mock("GET", "/v1/boards/other/jobs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"jobs": [{"id": 7, "title": "SRE"}]}).to_string())
            .create_async()
            .await;

        let adapter = GreenhouseAdapter::new(&test_config(2), None)
            .unwrap()
            .with_base_url(server.url());
        let mut sink = Vec::new();
        adapter
            .scrape(&orgs(&["acme", "ghost", "other"]), &limits(), &mut sink)
            .await;

        // 503 is retried, 404 is not.
        down.assert_async().await;
        missing.assert_async().await;
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].organization, "other");
        assert_eq!(sink[0].url, "https://boards.greenhouse.io/other/jobs/7");
    }

    #[tokio::test]
    async fn test_timed_out_organization_does_not_sink_the_batch() {
        let mut server = mockito::Server::new_async().await;
        let stalled = server
            .mock("GET", "/v1/boards/acme/jobs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_secs(3));
                w.write_all(br#"{"jobs": []}"#)
            })
            .expect(2)
            .create_async()
            .await;
        let _other = server
            .mock("GET", "/v1/boards/other/jobs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"jobs": [{"id": 7, "title": "SRE"}]}).to_string())
            .create_async()
            .await;

        let config = AppConfig {
            request_timeout_secs: 1,
            ..test_config(2)
        };
        let adapter = GreenhouseAdapter::new(&config, None)
            .unwrap()
            .with_base_url(server.url());
        let mut sink = Vec::new();
        adapter
            .scrape(&orgs(&["acme", "other"]), &limits(), &mut sink)
            .await;

        // Timeouts are transient, so acme is tried twice before it degrades.
        stalled.assert_async().await;
        let jobs: Vec<(&str, &str)> = sink
            .iter()
            .map(|job| (job.organization.as_str(), job.id.as_str()))
            .collect();
        assert_eq!(jobs, vec![("other", "7")]);
    }

    #[tokio::test]
    async fn test_greenhouse_single_posting_detail() {
        let mut server = mockito::Server::new_async().await;
        let _found = server
            .mock("GET", "/v1/boards/acme/jobs/111")
            .with_status(200)
            .with_body(
                json!({
                    "id": 111,
                    "title": "Platform Engineer",
                    "location": {"name": "Berlin"},
                    "content": "&lt;p&gt;Hi&lt;/p&gt;"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let gone = server
            .mock("GET", "/v1/boards/acme/jobs/222")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let adapter = GreenhouseAdapter::new(&test_config(2), None)
            .unwrap()
            .with_base_url(server.url());
        assert!(!adapter.requires_detail());

        let listing = |id: &str| RawListing {
            id: id.to_string(),
            title: "Engineer".to_string(),
            ..Default::default()
        };
        let detail = adapter.fetch_detail("acme", &listing("111")).await.unwrap();
        assert_eq!(detail.title.as_deref(), Some("Platform Engineer"));
        assert_eq!(detail.fields.location_name.as_deref(), Some("Berlin"));
        assert_eq!(detail.fields.description.as_deref(), Some("&lt;p&gt;Hi&lt;/p&gt;"));

        assert!(adapter.fetch_detail("acme", &listing("222")).await.is_none());
        gone.assert_async().await;
    }

    #[tokio::test]
    async fn test_ashby_list_and_detail() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("POST", "/api/non-user-graphql")
            .match_query(Matcher::UrlEncoded("op".into(), "ApiJobBoardWithTeams".into()))
            .match_header("apollographql-client-name", "frontend_non_user")
            .match_body(Matcher::PartialJson(json!({
                "variables": {"organizationHostedJobsPageName": "acme"}
            })))
            .with_status(200)
            .with_body(
                json!({"data": {"jobBoard": {"jobPostings": [
                    {"id": "p1", "title": "Platform Engineer", "locationName": "Remote",
                     "employmentType": "FullTime", "workplaceType": "Remote"},
                    {"id": "p2", "title": "Data Engineer", "locationName": "Berlin",
                     "employmentType": "FullTime", "workplaceType": null}
                ]}}})
                .to_string(),
            )
            .create_async()
            .await;
        let _detail_ok = server
            .mock("POST", "/api/non-user-graphql")
            .match_query(Matcher::UrlEncoded("op".into(), "ApiJobPosting".into()))
            .match_body(Matcher::PartialJson(json!({"variables": {"jobPostingId": "p1"}})))
            .with_status(200)
            .with_body(
                json!({"data": {"jobPosting": {
                    "id": "p1", "title": "Platform Engineer", "locationName": "New York",
                    "descriptionHtml": "<p>Run <em>everything</em></p>",
                    "compensationTierSummary": "$150K – $180K"
                }}})
                .to_string(),
            )
            .create_async()
            .await;
        let _detail_gone = server
            .mock("POST", "/api/non-user-graphql")
            .match_query(Matcher::UrlEncoded("op".into(), "ApiJobPosting".into()))
            .match_body(Matcher::PartialJson(json!({"variables": {"jobPostingId": "p2"}})))
            .with_status(404)
            .create_async()
            .await;

        let adapter = AshbyAdapter::new(&test_config(1), None)
            .unwrap()
            .with_base_url(server.url());
        let mut sink = Vec::new();
        adapter.scrape(&orgs(&["acme"]), &limits(), &mut sink).await;

        assert_eq!(sink.len(), 2);

        let detailed = find(&sink, "p1");
        assert_eq!(detailed.location_name, "New York");
        assert_eq!(detailed.workplace_type, "Remote");
        assert_eq!(detailed.compensation, "$150K – $180K");
        assert_eq!(detailed.description, "Run everything");
        assert_eq!(detailed.url, "https://jobs.ashbyhq.com/acme/p1");
        assert_eq!(detailed.timestamp, "");

        // No detail: listing fields survive, description stays empty.
        let bare = find(&sink, "p2");
        assert_eq!(bare.location_name, "Berlin");
        assert_eq!(bare.workplace_type, "");
        assert_eq!(bare.description, "");
    }

    #[tokio::test]
    async fn test_ashby_unknown_board_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("POST", "/api/non-user-graphql")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": {"jobBoard": null}}"#)
            .create_async()
            .await;

        let adapter = AshbyAdapter::new(&test_config(1), None)
            .unwrap()
            .with_base_url(server.url());
        assert!(adapter.list_postings("ghost").await.is_empty());
    }

    #[tokio::test]
    async fn test_lever_board_and_posting_pages() {
        let mut server = mockito::Server::new_async().await;
        let board = r#"
            <div class="posting" data-qa-posting-id="abc">
              <a class="posting-title" href="https://jobs.lever.co/acme/abc">
                <h5 data-qa="posting-name">Backend Engineer</h5>
                <div class="posting-categories">
                  <span class="location">Remote</span>
                  <span class="commitment">Full-time</span>
                </div>
              </a>
            </div>"#;
        let _board = server
            .mock("GET", "/acme")
            .with_status(200)
            .with_body(board)
            .create_async()
            .await;
        let _posting = server
            .mock("GET", "/acme/abc")
            .with_status(200)
            .with_body(
                r#"<div class="content"><div class="description"><p>Ship APIs</p></div></div>"#,
            )
            .create_async()
            .await;

        let adapter = LeverAdapter::new(&test_config(1), None)
            .unwrap()
            .with_base_url(server.url());
        let mut sink = Vec::new();
        adapter.scrape(&orgs(&["acme"]), &limits(), &mut sink).await;

        assert_eq!(sink.len(), 1);
        let job = &sink[0];
        assert_eq!(job.title, "Backend Engineer");
        assert_eq!(job.location_name, "Remote");
        assert_eq!(job.employment_type, "Full-time");
        assert_eq!(job.description, "Ship APIs");
        assert_eq!(job.url, "https://jobs.lever.co/acme/abc");
        assert!(!adapter.has_authoritative_timestamps());
    }

    #[tokio::test]
    async fn test_workable_pagination_and_detail() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("POST", "/api/v3/accounts/acme-labs/jobs")
            .match_body(Matcher::Json(json!({
                "query": "", "department": [], "location": [], "workplace": [], "worktype": []
            })))
            .with_status(200)
            .with_body(
                json!({
                    "results": [{
                        "id": 1001, "shortcode": "AB12CD", "title": "Rust Engineer",
                        "locations": [{"city": "Austin", "region": "Texas", "country": "United States"}],
                        "workplace": "hybrid", "type": "full", "published": "2024-03-01T00:00:00.000Z"
                    }],
                    "nextPage": "tok-2"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _second = server
            .mock("POST", "/api/v3/accounts/acme-labs/jobs")
            .match_body(Matcher::PartialJson(json!({"token": "tok-2"})))
            .with_status(200)
            .with_body(
                json!({
                    "results": [{
                        "id": 1002, "shortcode": "EF34GH", "title": "SRE",
                        "location": {"city": "", "region": null, "country": "Canada"}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _detail = server
            .mock("GET", "/api/v2/accounts/acme-labs/jobs/AB12CD")
            .with_status(200)
            .with_body(
                json!({
                    "title": "Senior Rust Engineer",
                    "description": "<p>Write Rust</p>",
                    "requirements": "<ul><li>Tokio</li></ul>",
                    "benefits": ""
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _detail_missing = server
            .mock("GET", "/api/v2/accounts/acme-labs/jobs/EF34GH")
            .with_status(404)
            .create_async()
            .await;

        let adapter = WorkableAdapter::new(&test_config(1), None)
            .unwrap()
            .with_base_url(server.url());
        let mut sink = Vec::new();
        adapter.scrape(&orgs(&["acme-labs"]), &limits(), &mut sink).await;

        assert_eq!(sink.len(), 2);

        let rust = find(&sink, "1001");
        assert_eq!(rust.organization, "Acme Labs");
        assert_eq!(rust.title, "Senior Rust Engineer");
        assert_eq!(rust.location_name, "Austin, Texas");
        assert_eq!(rust.workplace_type, "hybrid");
        assert_eq!(rust.employment_type, "full");
        assert_eq!(rust.description, "Write Rust Tokio");
        assert_eq!(rust.url, "https://apply.workable.com/acme-labs/j/AB12CD/");
        assert_eq!(rust.timestamp, "2024-03-01T00:00:00Z");

        let sre = find(&sink, "1002");
        assert_eq!(sre.location_name, "Canada");
        assert_eq!(sre.description, "");
    }

    /// Scripted adapter for driver behaviour that needs no HTTP.
    struct FakeAdapter;

    #[async_trait]
    impl PlatformAdapter for FakeAdapter {
        fn platform(&self) -> Platform {
            Platform::Lever
        }

        async fn list_postings(&self, org: &str) -> Vec<RawListing> {
            match org {
                "boom" => panic!("listing exploded"),
                "empty" => Vec::new(),
                _ => ["1", "2", "2"]
                    .iter()
                    .map(|id| RawListing {
                        id: id.to_string(),
                        title: format!("Job {}", id),
                        fields: PostingFields {
                            location_name: Some("Listed".to_string()),
                            employment_type: Some("Listed".to_string()),
                            ..Default::default()
                        },
                        ..Default::default()
                    })
                    .collect(),
            }
        }

        async fn fetch_detail(&self, _org: &str, listing: &RawListing) -> Option<RawDetail> {
            (listing.id == "1").then(|| RawDetail {
                title: None,
                fields: PostingFields {
                    location_name: Some("Detailed".to_string()),
                    ..Default::default()
                },
            })
        }

        fn posting_url(&self, org: &str, listing: &RawListing) -> String {
            format!("https://example.test/{}/{}", org, listing.id)
        }
    }

    #[tokio::test]
    async fn test_panicking_organization_is_isolated() {
        let mut sink = Vec::new();
        FakeAdapter
            .scrape(&orgs(&["boom", "acme", "empty", "beta"]), &limits(), &mut sink)
            .await;

        let mut seen: Vec<(String, String)> = sink
            .iter()
            .map(|job| (job.organization.clone(), job.id.clone()))
            .collect();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                ("acme".to_string(), "1".to_string()),
                ("acme".to_string(), "2".to_string()),
                ("beta".to_string(), "1".to_string()),
                ("beta".to_string(), "2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_detail_precedence_through_driver() {
        let mut sink = Vec::new();
        FakeAdapter.scrape(&orgs(&["acme"]), &limits(), &mut sink).await;

        let detailed = find(&sink, "1");
        assert_eq!(detailed.location_name, "Detailed");
        assert_eq!(detailed.employment_type, "Listed");
        assert_eq!(detailed.title, "Job 1");

        let listed = find(&sink, "2");
        assert_eq!(listed.location_name, "Listed");
        assert_eq!(listed.url, "https://example.test/acme/2");
    }

    #[test]
    fn test_no_organizations_means_no_requests() {
        let mut sink = Vec::new();
        tokio_test::block_on(FakeAdapter.scrape(&[], &limits(), &mut sink));
        assert!(sink.is_empty());
    }
}
