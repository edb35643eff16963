// The interactive run, as a linear sequence of stages:
// connection mode, login (up to three tries), course fetch, summary and
// the optional PDF export. Data produced by one stage (proxy, session
// token, records) is handed to the next explicitly.

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::api::Transport;
use crate::auth::{Credentials, PortalSession, SessionToken};
use crate::config::Config;
use crate::courses::{fetch_courses, CourseRecord};
use crate::proxy::{read_proxy_file, select_live_proxy, ProxyEndpoint};
use crate::report::console::{render_course_table, render_summary};
use crate::report::pdf::PdfExporter;
use crate::report::ReportSummary;
use crate::ui::{self, Prompter};

pub const MAX_LOGIN_ATTEMPTS: usize = 3;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::Cancelled => 130,
            RunOutcome::Failed(_) => 1,
        }
    }
}

#[derive(Debug)]
enum Stage {
    ChoosingConnectionMode,
    Authenticating,
    FetchingCourses {
        student_id: String,
        token: SessionToken,
    },
    DisplayingSummary {
        student_id: String,
        courses: Vec<CourseRecord>,
        fetch_time: Duration,
    },
    OfferingExport {
        student_id: String,
        courses: Vec<CourseRecord>,
    },
    Done(RunOutcome),
}

pub struct App<'a, T, P> {
    transport: &'a T,
    config: &'a Config,
    prompter: P,
    proxy: Option<ProxyEndpoint>,
    export_name: Option<String>,
}

impl<'a, T: Transport, P: Prompter> App<'a, T, P> {
    pub fn new(transport: &'a T, config: &'a Config, prompter: P) -> Self {
        App {
            transport,
            config,
            prompter,
            proxy: None,
            export_name: None,
        }
    }

    /// Use a fixed report file name instead of a timestamped one.
    pub fn with_export_name(mut self, name: impl Into<String>) -> Self {
        self.export_name = Some(name.into());
        self
    }

    pub fn into_prompter(self) -> P {
        self.prompter
    }

    /// Drive the run to completion. `Err` is reserved for local failures
    /// such as a broken terminal; portal problems end in `RunOutcome`.
    pub fn run(&mut self) -> Result<RunOutcome> {
        ui::banner();
        let mut stage = Stage::ChoosingConnectionMode;
        loop {
            log::debug!("entering stage {stage:?}");
            stage = match stage {
                Stage::ChoosingConnectionMode => self.choose_connection_mode()?,
                Stage::Authenticating => self.authenticate()?,
                Stage::FetchingCourses { student_id, token } => {
                    self.fetch(student_id, &token)
                }
                Stage::DisplayingSummary {
                    student_id,
                    courses,
                    fetch_time,
                } => self.display_summary(student_id, courses, fetch_time),
                Stage::OfferingExport {
                    student_id,
                    courses,
                } => self.offer_export(&student_id, &courses)?,
                Stage::Done(outcome) => return Ok(outcome),
            };
        }
    }

    fn cancelled(&self, what: &str) -> Stage {
        println!();
        ui::info(&format!("{what} cancelled by user"));
        Stage::Done(RunOutcome::Cancelled)
    }

    fn choose_connection_mode(&mut self) -> Result<Stage> {
        ui::section("Connection Mode");
        let Some(enable) = self
            .prompter
            .confirm("Do you want to enable Proxy Mode?", false)?
        else {
            return Ok(self.cancelled("Proxy setup"));
        };

        if !enable {
            ui::info("Using Direct Connection");
            return Ok(Stage::Authenticating);
        }

        ui::info("Testing available proxies...");
        self.proxy = self.find_live_proxy();
        match &self.proxy {
            Some(proxy) => ui::success(&format!("Using Proxy Mode: {proxy}")),
            None => ui::info("No working proxies found. Switching to direct mode."),
        }
        Ok(Stage::Authenticating)
    }

    fn find_live_proxy(&self) -> Option<ProxyEndpoint> {
        let list = match read_proxy_file(&self.config.proxy_file) {
            Ok(list) => list,
            Err(e) => {
                log::warn!("{} ({})", e, e.category());
                ui::error(&e.to_string());
                return None;
            }
        };
        for line in &list.rejected {
            ui::warning(&format!("Invalid proxy format: {line}"));
        }
        if list.candidates.is_empty() {
            ui::error(&format!(
                "No proxies found in {}",
                self.config.proxy_file.display()
            ));
            return None;
        }

        ui::info(&format!("Found {} proxies to test", list.candidates.len()));
        select_live_proxy(self.transport, self.config, &list.candidates, |report| {
            if report.live {
                ui::success(&format!("Working proxy found: {}", report.endpoint));
            } else {
                ui::note(&format!(
                    "Proxy {}/{} {} failed",
                    report.index, report.total, report.endpoint
                ));
            }
        })
    }

    fn authenticate(&mut self) -> Result<Stage> {
        ui::section("Authentication");

        let mut attempts = 0;
        while attempts < MAX_LOGIN_ATTEMPTS {
            let Some(student_id) = self.prompter.text("Student ID")? else {
                return Ok(self.cancelled("Authentication"));
            };
            let student_id = student_id.trim().to_string();
            if student_id.is_empty() {
                attempts += 1;
                self.report_failed_attempt("Student ID cannot be empty", attempts);
                continue;
            }

            let Some(password) = self.prompter.password("Password")? else {
                return Ok(self.cancelled("Authentication"));
            };
            if password.is_empty() {
                attempts += 1;
                self.report_failed_attempt("Password cannot be empty", attempts);
                continue;
            }

            let credentials = Credentials {
                student_id,
                password,
            };
            let spinner = ui::spinner("Authenticating user...");
            let started = Instant::now();
            let result = PortalSession::new(self.transport, self.config)
                .authenticate(&credentials, self.proxy.as_ref());
            spinner.finish_and_clear();

            match result {
                Ok(token) => {
                    let took = started.elapsed().as_secs_f64();
                    ui::clear_screen();
                    ui::banner();
                    ui::success(&format!("Login successful! (took {took:.2}s)"));
                    return Ok(Stage::FetchingCourses {
                        student_id: credentials.student_id,
                        token,
                    });
                }
                Err(e) => {
                    log::warn!("login attempt failed ({}): {e}", e.category());
                    attempts += 1;
                    self.report_failed_attempt(&e.to_string(), attempts);
                }
            }
        }

        let reason = format!("Maximum authentication attempts ({MAX_LOGIN_ATTEMPTS}) exceeded");
        ui::error(&reason);
        Ok(Stage::Done(RunOutcome::Failed(reason)))
    }

    fn report_failed_attempt(&self, reason: &str, attempts: usize) {
        ui::error(reason);
        if attempts < MAX_LOGIN_ATTEMPTS {
            ui::note(&format!(
                "Attempts remaining: {}",
                MAX_LOGIN_ATTEMPTS - attempts
            ));
        }
    }

    fn fetch(&self, student_id: String, token: &SessionToken) -> Stage {
        ui::section("Fetching Courses");
        let spinner = ui::spinner("Fetching course data...");
        let started = Instant::now();
        let result = fetch_courses(self.transport, self.config, token, self.proxy.as_ref());
        let fetch_time = started.elapsed();
        spinner.finish_and_clear();

        match result {
            Ok(courses) => {
                ui::success(&format!("Successfully fetched {} courses!", courses.len()));
                ui::note(&format!(
                    "Completed in {:.2} seconds",
                    fetch_time.as_secs_f64()
                ));
                Stage::DisplayingSummary {
                    student_id,
                    courses,
                    fetch_time,
                }
            }
            Err(e) => {
                log::error!("course fetch failed ({}): {e}", e.category());
                ui::error(&e.to_string());
                Stage::Done(RunOutcome::Failed(e.to_string()))
            }
        }
    }

    fn display_summary(
        &self,
        student_id: String,
        courses: Vec<CourseRecord>,
        fetch_time: Duration,
    ) -> Stage {
        let summary = ReportSummary::from_records(&courses, fetch_time);
        ui::summary(&render_summary(&summary));

        if courses.is_empty() {
            ui::goodbye();
            return Stage::Done(RunOutcome::Completed);
        }
        ui::block(&render_course_table(&courses));
        Stage::OfferingExport {
            student_id,
            courses,
        }
    }

    fn offer_export(&mut self, student_id: &str, courses: &[CourseRecord]) -> Result<Stage> {
        println!();
        let Some(export) = self
            .prompter
            .confirm("Would you like to save this data as a PDF report?", true)?
        else {
            return Ok(self.cancelled("Export"));
        };

        if export {
            ui::step("Generating PDF report...");
            let exporter = PdfExporter::new(&self.config.output_dir);
            match exporter.export(courses, student_id, self.export_name.as_deref()) {
                Ok(path) => {
                    ui::clear_screen();
                    ui::banner();
                    ui::success("PDF saved successfully!");
                    ui::info(&format!("Location: {}", path.display()));
                }
                Err(e) => {
                    log::error!("pdf export failed: {e}");
                    ui::error(&format!("Failed to generate PDF: {e}"));
                }
            }
        } else {
            ui::clear_screen();
            ui::banner();
        }
        ui::goodbye();
        Ok(Stage::Done(RunOutcome::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunOutcome::Completed.exit_code(), 0);
        assert_eq!(RunOutcome::Cancelled.exit_code(), 130);
        assert_eq!(RunOutcome::Failed("x".into()).exit_code(), 1);
    }
}
