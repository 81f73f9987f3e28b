// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP attempt executor against the club's tee-sheet site.
//!
//! One attempt is one fresh session: log in, fetch the tee sheet for the
//! requested date, pick the open slot nearest the preference, reserve it.
//! The reqwest client (and with it the session cookie jar) is scoped to the
//! attempt, so every exit path drops the session.
//!
//! Classification, not judgement: this executor reports what happened as an
//! [`AttemptOutcome`] tag and leaves retry decisions to the lifecycle
//! controller. Network faults and server errors are transient; a rejected
//! login is permanent.

use std::time::Duration;

use async_trait::async_trait;
use fairway_core::{AttemptExecutor, AttemptOutcome, AttemptRequest, FairwayError};
use fairway_engine::slot;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::parse;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The date format the tee sheet expects in its query string.
const SHEET_DATE_FORMAT: &str = "%m/%d/%Y";

pub struct ClubExecutor {
    base_url: String,
    username: String,
    password: String,
}

impl ClubExecutor {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        }
    }

    fn client(&self) -> Result<reqwest::Client, FairwayError> {
        reqwest::Client::builder()
            .cookie_store(true)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| FairwayError::Executor {
                message: "failed to build HTTP client".to_string(),
                source: Some(Box::new(e)),
            })
    }

    async fn login(&self, client: &reqwest::Client) -> Result<Option<AttemptOutcome>, FairwayError> {
        let url = format!("{}/login", self.base_url);
        let response = match client
            .post(&url)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return Ok(Some(AttemptOutcome::TransientFailure {
                    reason: format!("login request failed: {e}"),
                }))
            }
        };

        match response.status() {
            s if s.is_success() => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("club site rejected credentials");
                Ok(Some(AttemptOutcome::PermanentFailure {
                    reason: "club site rejected credentials".to_string(),
                }))
            }
            s => Ok(Some(AttemptOutcome::TransientFailure {
                reason: format!("login returned status {s}"),
            })),
        }
    }
}

#[async_trait]
impl AttemptExecutor for ClubExecutor {
    async fn attempt(&self, req: &AttemptRequest) -> Result<AttemptOutcome, FairwayError> {
        let client = self.client()?;

        if let Some(outcome) = self.login(&client).await? {
            return Ok(outcome);
        }
        debug!(requester = %req.requester, "logged in to club site");

        let sheet_url = format!(
            "{}/teesheet?date={}",
            self.base_url,
            req.requested_date.format(SHEET_DATE_FORMAT)
        );
        let sheet = match client.get(&sheet_url).send().await {
            Ok(r) if r.status().is_success() => match r.text().await {
                Ok(body) => body,
                Err(e) => {
                    return Ok(AttemptOutcome::TransientFailure {
                        reason: format!("failed to read tee sheet: {e}"),
                    })
                }
            },
            Ok(r) => {
                return Ok(AttemptOutcome::TransientFailure {
                    reason: format!("tee sheet returned status {}", r.status()),
                })
            }
            Err(e) => {
                return Ok(AttemptOutcome::TransientFailure {
                    reason: format!("tee sheet request failed: {e}"),
                })
            }
        };

        let candidates = parse::open_slots(&sheet);
        debug!(count = candidates.len(), date = %req.requested_date, "open slots parsed");

        let Some(chosen) = slot::select(req.requested_time, &candidates) else {
            return Ok(AttemptOutcome::TransientFailure {
                reason: "no open slots on the tee sheet".to_string(),
            });
        };

        let reserve_url = format!("{}/teesheet/reserve", self.base_url);
        let date_field = req.requested_date.format(SHEET_DATE_FORMAT).to_string();
        let time_field = chosen.format("%H:%M").to_string();
        let reservation = match client
            .post(&reserve_url)
            .form(&[("date", date_field.as_str()), ("time", time_field.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return Ok(AttemptOutcome::TransientFailure {
                    reason: format!("reservation request failed: {e}"),
                })
            }
        };

        if !reservation.status().is_success() {
            // Includes the slot being snatched between fetch and reserve; the
            // next attempt re-reads the sheet.
            return Ok(AttemptOutcome::TransientFailure {
                reason: format!("reservation returned status {}", reservation.status()),
            });
        }

        info!(slot = %chosen, date = %req.requested_date, "tee time reserved");
        Ok(AttemptOutcome::Success {
            booked_slot: chosen,
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use fairway_core::BookingId;

    fn request_for(time: NaiveTime) -> AttemptRequest {
        AttemptRequest {
            request_id: BookingId(1),
            public_id: Uuid::new_v4(),
            requester: "casey".to_string(),
            requested_date: NaiveDate::from_ymd_opt(2026, 9, 18).unwrap(),
            requested_time: time,
            attempt_number: 1,
        }
    }

    fn sheet_html() -> &'static str {
        r#"
            <div class="tsSection openTee" data-time="07:50">Reserve</div>
            <div class="tsSection bookedTee" data-time="08:00">Taken</div>
            <div class="tsSection openTee" data-time="08:10">Reserve</div>
            <div class="tsSection openTee" data-time="09:00">Reserve</div>
        "#
    }

    async fn mock_login_ok(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn books_the_nearest_open_slot() {
        let server = MockServer::start().await;
        mock_login_ok(&server).await;
        Mock::given(method("GET"))
            .and(path("/teesheet"))
            .and(query_param("date", "09/18/2026"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sheet_html()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/teesheet/reserve"))
            .and(body_string_contains("time=07%3A50"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let executor = ClubExecutor::new(server.uri(), "casey", "secret");
        let outcome = executor
            .attempt(&request_for(NaiveTime::from_hms_opt(8, 0, 0).unwrap()))
            .await
            .unwrap();

        // 07:50 and 08:10 are equidistant from 08:00; the earlier slot wins.
        match outcome {
            AttemptOutcome::Success {
                booked_slot,
                candidates,
            } => {
                assert_eq!(booked_slot, NaiveTime::from_hms_opt(7, 50, 0).unwrap());
                assert_eq!(candidates.len(), 3);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_credentials_are_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let executor = ClubExecutor::new(server.uri(), "casey", "wrong");
        let outcome = executor
            .attempt(&request_for(NaiveTime::from_hms_opt(8, 0, 0).unwrap()))
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::PermanentFailure { .. }));
    }

    #[tokio::test]
    async fn empty_tee_sheet_is_transient() {
        let server = MockServer::start().await;
        mock_login_ok(&server).await;
        Mock::given(method("GET"))
            .and(path("/teesheet"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>full up</html>"))
            .mount(&server)
            .await;

        let executor = ClubExecutor::new(server.uri(), "casey", "secret");
        let outcome = executor
            .attempt(&request_for(NaiveTime::from_hms_opt(8, 0, 0).unwrap()))
            .await
            .unwrap();

        match outcome {
            AttemptOutcome::TransientFailure { reason } => {
                assert!(reason.contains("no open slots"));
            }
            other => panic!("expected transient failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tee_sheet_server_error_is_transient() {
        let server = MockServer::start().await;
        mock_login_ok(&server).await;
        Mock::given(method("GET"))
            .and(path("/teesheet"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let executor = ClubExecutor::new(server.uri(), "casey", "secret");
        let outcome = executor
            .attempt(&request_for(NaiveTime::from_hms_opt(8, 0, 0).unwrap()))
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::TransientFailure { .. }));
    }

    #[tokio::test]
    async fn lost_reservation_race_is_transient() {
        let server = MockServer::start().await;
        mock_login_ok(&server).await;
        Mock::given(method("GET"))
            .and(path("/teesheet"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sheet_html()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/teesheet/reserve"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let executor = ClubExecutor::new(server.uri(), "casey", "secret");
        let outcome = executor
            .attempt(&request_for(NaiveTime::from_hms_opt(8, 0, 0).unwrap()))
            .await
            .unwrap();

        match outcome {
            AttemptOutcome::TransientFailure { reason } => {
                assert!(reason.contains("409"));
            }
            other => panic!("expected transient failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_site_is_transient() {
        // Nothing listens on this port.
        let executor = ClubExecutor::new("http://127.0.0.1:1", "casey", "secret");
        let outcome = executor
            .attempt(&request_for(NaiveTime::from_hms_opt(8, 0, 0).unwrap()))
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::TransientFailure { .. }));
    }
}
