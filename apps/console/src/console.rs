// apps/console/src/console.rs
//
// Line-driven host for the scheduling core. Typed dates and times are fed to
// the field validators one character at a time and then blurred, the way a
// form would deliver them.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::debug;

use scheduling_cell::services::codec::{format_calendar_date_to_display, format_timestamp_to_display};
use scheduling_cell::{
    search_directory, AppointmentBoard, AppointmentFilter, AppointmentRef, BookingWizard,
    DashboardSummary, SchedulingStore, TemporalPolicyGuard, WizardStage,
};
use shared_models::{AppError, SessionContext};

const HELP: &str = "\
Commands:
  fields                       list medical fields
  search <text>                find doctors and medical fields
  book [field_id [doctor_id]]  start a booking, optionally prefilled
  list [all|upcoming|past]     show your appointments
  cancel <id>                  cancel an appointment
  reschedule <id>              move an appointment
  dashboard                    overview of your appointments
  login <token>                replace the session token
  help                         this text
  quit                         leave
While booking, answer 'back' to return a step or 'cancel' to stop.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Fields,
    Search(String),
    Book { field_id: Option<i64>, doctor_id: Option<i64> },
    List(AppointmentFilter),
    Cancel(i64),
    Reschedule(i64),
    Dashboard,
    Login(String),
    Quit,
}

fn parse_id(raw: Option<&str>, what: &str) -> Result<i64, String> {
    let raw = raw.ok_or_else(|| format!("Missing {}", what))?;
    raw.parse().map_err(|_| format!("Invalid {}: {}", what, raw))
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();

        match word.to_ascii_lowercase().as_str() {
            "help" | "?" => Ok(Command::Help),
            "fields" => Ok(Command::Fields),
            "search" => Ok(Command::Search(rest.to_string())),
            "book" => {
                let field_id = args.next().map(|raw| parse_id(Some(raw), "field id")).transpose()?;
                let doctor_id = args.next().map(|raw| parse_id(Some(raw), "doctor id")).transpose()?;
                Ok(Command::Book { field_id, doctor_id })
            }
            "list" => match args.next().unwrap_or("all") {
                "all" => Ok(Command::List(AppointmentFilter::All)),
                "upcoming" => Ok(Command::List(AppointmentFilter::Upcoming)),
                "past" => Ok(Command::List(AppointmentFilter::Past)),
                other => Err(format!("Unknown filter: {}", other)),
            },
            "cancel" => Ok(Command::Cancel(parse_id(args.next(), "appointment id")?)),
            "reschedule" => Ok(Command::Reschedule(parse_id(args.next(), "appointment id")?)),
            "dashboard" => Ok(Command::Dashboard),
            "login" if !rest.is_empty() => Ok(Command::Login(rest.to_string())),
            "login" => Err("Missing token".to_string()),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err(String::new()),
            other => Err(format!("Unknown command: {} (try 'help')", other)),
        }
    }
}

/// One answer inside a multi-step dialog.
enum Answer {
    Text(String),
    Back,
    Abort,
}

pub struct Console<R, W> {
    store: Arc<dyn SchedulingStore>,
    guard: TemporalPolicyGuard,
    session: Arc<SessionContext>,
    board: AppointmentBoard,
    lines: Lines<R>,
    out: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        guard: TemporalPolicyGuard,
        session: Arc<SessionContext>,
        input: R,
        out: W,
    ) -> Self {
        Self {
            board: AppointmentBoard::new(store.clone(), guard.clone()),
            store,
            guard,
            session,
            lines: input.lines(),
            out,
        }
    }

    // ==========================================================================
    // I/O HELPERS
    // ==========================================================================

    async fn say(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    async fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.out.write_all(prompt.as_bytes()).await?;
        self.out.flush().await?;
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_string()))
    }

    async fn ask_step(&mut self, prompt: &str) -> io::Result<Answer> {
        Ok(match self.ask(prompt).await? {
            None => Answer::Abort,
            Some(line) => match line.to_ascii_lowercase().as_str() {
                "cancel" | "quit" => Answer::Abort,
                "back" => Answer::Back,
                _ => Answer::Text(line),
            },
        })
    }

    async fn report(&mut self, err: impl Into<AppError>) -> io::Result<()> {
        let notice = err.into().into_notice();
        self.say(&format!("! {}", notice.message)).await
    }

    fn describe(&self, appointment: &AppointmentRef) -> String {
        let field = appointment.medical_field_name.as_deref().unwrap_or("-");
        let marker = if self.board.can_modify(appointment) { "" } else { " (locked)" };
        format!(
            "#{:<5} {}  {} ({})  {}{}",
            appointment.id,
            format_timestamp_to_display(&appointment.appointment_date),
            appointment.doctor_name,
            field,
            appointment.status,
            marker
        )
    }

    // ==========================================================================
    // MAIN LOOP
    // ==========================================================================

    pub async fn run(&mut self) -> io::Result<()> {
        self.say("Appointment booking console. Type 'help' for commands.").await?;

        while let Some(line) = self.ask("> ").await? {
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(msg) if msg.is_empty() => continue,
                Err(msg) => {
                    self.say(&msg).await?;
                    continue;
                }
            };
            debug!("Console command {:?}", command);

            match command {
                Command::Help => self.say(HELP).await?,
                Command::Fields => self.show_fields().await?,
                Command::Search(query) => self.search(&query).await?,
                Command::Book { field_id, doctor_id } => self.book(field_id, doctor_id).await?,
                Command::List(filter) => self.list(filter).await?,
                Command::Cancel(id) => self.cancel(id).await?,
                Command::Reschedule(id) => self.reschedule(id).await?,
                Command::Dashboard => self.dashboard().await?,
                Command::Login(token) => {
                    self.session.set_token(token).await;
                    self.say("Session token updated").await?;
                }
                Command::Quit => break,
            }
        }
        Ok(())
    }

    // ==========================================================================
    // DIRECTORY
    // ==========================================================================

    async fn show_fields(&mut self) -> io::Result<()> {
        match self.store.list_medical_fields().await {
            Ok(fields) => {
                for field in fields {
                    self.say(&format!("  [{}] {}", field.id, field.name)).await?;
                }
                Ok(())
            }
            Err(e) => self.report(e).await,
        }
    }

    async fn search(&mut self, query: &str) -> io::Result<()> {
        let results = match search_directory(self.store.as_ref(), query).await {
            Ok(results) => results,
            Err(e) => return self.report(e).await,
        };

        if results.is_empty() {
            return self.say("No matches").await;
        }
        for field in &results.medical_fields {
            self.say(&format!("  field  [{}] {}  -> book {}", field.id, field.name, field.id)).await?;
        }
        for doctor in &results.doctors {
            let hint = match doctor.field_id() {
                Some(field_id) => format!("  -> book {} {}", field_id, doctor.id),
                None => String::new(),
            };
            self.say(&format!("  doctor [{}] {}{}", doctor.id, doctor.name, hint)).await?;
        }
        Ok(())
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    async fn book(&mut self, field_id: Option<i64>, doctor_id: Option<i64>) -> io::Result<()> {
        let mut wizard = BookingWizard::new(self.store.clone(), self.guard.clone());

        let started = match field_id {
            Some(field_id) => wizard.prefill(field_id, doctor_id).await.map(|_| ()),
            None => wizard.load_fields().await.map(|_| ()),
        };
        if let Err(e) = started {
            return self.report(e).await;
        }

        loop {
            self.say(&format!("-- Step {} of 4: {}", wizard.stage().number(), wizard.stage())).await?;

            let done = match wizard.stage() {
                WizardStage::Field => self.field_step(&mut wizard).await?,
                WizardStage::Doctor => self.doctor_step(&mut wizard).await?,
                WizardStage::Schedule => self.schedule_step(&mut wizard).await?,
                WizardStage::Confirm => self.confirm_step(&mut wizard).await?,
            };
            if done {
                return Ok(());
            }
        }
    }

    /// Apply a navigation answer. Returns true when the dialog should end.
    fn navigate(wizard: &mut BookingWizard, answer: &Answer) -> bool {
        match answer {
            Answer::Abort => true,
            Answer::Back => {
                wizard.back();
                false
            }
            Answer::Text(_) => false,
        }
    }

    async fn advance(&mut self, wizard: &mut BookingWizard) -> io::Result<()> {
        if let Err(e) = wizard.next() {
            self.report(e).await?;
        }
        Ok(())
    }

    async fn field_step(&mut self, wizard: &mut BookingWizard) -> io::Result<bool> {
        let fields: Vec<String> = wizard.fields().iter().map(|f| format!("  [{}] {}", f.id, f.name)).collect();
        for line in fields {
            self.say(&line).await?;
        }

        let current = wizard.selected_field().map(|f| f.name.clone()).unwrap_or_default();
        let answer = self.ask_step(&format!("Medical field id [{}]: ", current)).await?;
        if let Answer::Text(text) = &answer {
            if !text.is_empty() {
                match text.parse::<i64>() {
                    Ok(id) => {
                        if let Err(e) = wizard.select_field(id) {
                            self.report(e).await?;
                            return Ok(false);
                        }
                    }
                    Err(_) => {
                        self.say("Please enter a number").await?;
                        return Ok(false);
                    }
                }
            }
            self.advance(wizard).await?;
        }
        Ok(Self::navigate(wizard, &answer))
    }

    async fn doctor_step(&mut self, wizard: &mut BookingWizard) -> io::Result<bool> {
        if wizard.doctors().is_empty() {
            if let Err(e) = wizard.load_doctors().await {
                self.report(e).await?;
                wizard.back();
                return Ok(false);
            }
        }
        if wizard.doctors().is_empty() {
            self.say("No doctors available in this field").await?;
            wizard.back();
            return Ok(false);
        }

        let doctors: Vec<String> = wizard
            .doctors()
            .iter()
            .map(|d| match d.experience_years {
                Some(years) => format!("  [{}] {} ({} years)", d.id, d.name, years),
                None => format!("  [{}] {}", d.id, d.name),
            })
            .collect();
        for line in doctors {
            self.say(&line).await?;
        }

        let current = wizard.selected_doctor().map(|d| d.name.clone()).unwrap_or_default();
        let answer = self.ask_step(&format!("Doctor id [{}]: ", current)).await?;
        if let Answer::Text(text) = &answer {
            if !text.is_empty() {
                let Ok(id) = text.parse::<i64>() else {
                    self.say("Please enter a number").await?;
                    return Ok(false);
                };
                if let Err(e) = wizard.select_doctor(id) {
                    self.report(e).await?;
                    return Ok(false);
                }
            }
            self.advance(wizard).await?;
        }
        Ok(Self::navigate(wizard, &answer))
    }

    async fn schedule_step(&mut self, wizard: &mut BookingWizard) -> io::Result<bool> {
        let current = wizard
            .state()
            .selected_date
            .map(|d| format_calendar_date_to_display(&d))
            .unwrap_or_default();
        let answer = self.ask_step(&format!("Date (dd/mm/yyyy) [{}]: ", current)).await?;
        let Answer::Text(typed) = &answer else {
            return Ok(Self::navigate(wizard, &answer));
        };

        if !typed.is_empty() {
            wizard.clear_date();
            let typed_result = wizard.type_date(typed);
            let blurred = wizard.blur_date();
            if let Err(e) = typed_result.and(blurred) {
                self.report(e).await?;
                return Ok(false);
            }
        }
        if wizard.state().selected_date.is_none() {
            self.say("Please enter a complete date").await?;
            return Ok(false);
        }

        if wizard.slots().is_empty() {
            if let Err(e) = wizard.load_slots().await {
                self.report(e).await?;
                return Ok(false);
            }
        }
        if wizard.slots().is_empty() {
            self.say("No available time slots on this date").await?;
            wizard.clear_date();
            return Ok(false);
        }

        let slots = wizard.slots().iter().map(ToString::to_string).collect::<Vec<_>>().join("  ");
        self.say(&format!("  Available: {}", slots)).await?;

        let current = wizard.state().selected_slot.map(|t| t.to_string()).unwrap_or_default();
        let answer = self.ask_step(&format!("Time (HH:mm) [{}]: ", current)).await?;
        if let Answer::Text(typed) = &answer {
            if !typed.is_empty() {
                wizard.clear_slot();
                let typed_result = wizard.type_time(typed);
                let blurred = wizard.blur_time();
                if let Err(e) = typed_result.and(blurred) {
                    self.report(e).await?;
                    return Ok(false);
                }
            }
            self.advance(wizard).await?;
        }
        Ok(Self::navigate(wizard, &answer))
    }

    async fn confirm_step(&mut self, wizard: &mut BookingWizard) -> io::Result<bool> {
        let field = wizard.selected_field().map(|f| f.name.clone()).unwrap_or_default();
        let doctor = wizard.selected_doctor().map(|d| d.name.clone()).unwrap_or_default();
        let when = wizard
            .pending_timestamp()
            .map(|ts| format_timestamp_to_display(&ts))
            .unwrap_or_default();
        self.say(&format!("  {} with {} on {}", field, doctor, when)).await?;

        let answer = self.ask_step("Notes (optional): ").await?;
        let Answer::Text(notes) = &answer else {
            return Ok(Self::navigate(wizard, &answer));
        };
        if !notes.is_empty() {
            wizard.set_notes(notes.clone());
        }

        let answer = self.ask_step("Book this appointment? (yes/no): ").await?;
        let Answer::Text(reply) = &answer else {
            return Ok(Self::navigate(wizard, &answer));
        };
        if !matches!(reply.to_ascii_lowercase().as_str(), "y" | "yes") {
            self.say("Booking cancelled").await?;
            return Ok(true);
        }

        match wizard.submit().await {
            Ok(appointment) => {
                self.say(&format!(
                    "Booked appointment #{} on {}",
                    appointment.id,
                    format_timestamp_to_display(&appointment.appointment_date)
                ))
                .await?;
                Ok(true)
            }
            Err(e) => {
                self.report(e).await?;
                Ok(false)
            }
        }
    }

    // ==========================================================================
    // APPOINTMENTS
    // ==========================================================================

    async fn list(&mut self, filter: AppointmentFilter) -> io::Result<()> {
        let appointments = match self.board.load(filter).await {
            Ok(list) => list.to_vec(),
            Err(e) => return self.report(e).await,
        };

        if appointments.is_empty() {
            return self.say("No appointments").await;
        }
        for appointment in &appointments {
            let line = self.describe(appointment);
            self.say(&line).await?;
        }
        Ok(())
    }

    async fn ensure_listed(&mut self, appointment_id: i64) -> io::Result<bool> {
        if self.board.find(appointment_id).is_none() {
            if let Err(e) = self.board.reload().await {
                self.report(e).await?;
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn cancel(&mut self, appointment_id: i64) -> io::Result<()> {
        if !self.ensure_listed(appointment_id).await? {
            return Ok(());
        }

        let reply = self.ask(&format!("Cancel appointment #{}? (yes/no): ", appointment_id)).await?;
        if !matches!(reply.as_deref(), Some("y") | Some("yes")) {
            return Ok(());
        }

        match self.board.cancel(appointment_id).await {
            Ok(()) => self.say(&format!("Appointment #{} cancelled", appointment_id)).await,
            Err(e) => self.report(e).await,
        }
    }

    async fn reschedule(&mut self, appointment_id: i64) -> io::Result<()> {
        if !self.ensure_listed(appointment_id).await? {
            return Ok(());
        }

        let mut flow = match self.board.begin_reschedule(appointment_id) {
            Ok(flow) => flow,
            Err(e) => return self.report(e).await,
        };

        loop {
            let current = flow.date_input().text().to_string();
            let Answer::Text(date) = self.ask_step(&format!("New date (dd/mm/yyyy) [{}]: ", current)).await? else {
                return Ok(());
            };
            if !date.is_empty() {
                flow.set_date(None);
                flow.type_date(&date);
                flow.blur_date();
            }

            let current = flow.time_input().text().to_string();
            let Answer::Text(time) = self.ask_step(&format!("New time (HH:mm) [{}]: ", current)).await? else {
                return Ok(());
            };
            if !time.is_empty() {
                flow.set_time(None);
                flow.type_time(&time);
                flow.blur_time();
            }

            if let Some(message) = flow.error().map(str::to_string) {
                self.say(&format!("! {}", message)).await?;
            }
            if flow.can_submit() {
                break;
            }
            if flow.date().is_none() || flow.time().is_none() {
                self.say("! Please select both date and time").await?;
            }
        }

        match flow.submit().await {
            Ok(outcome) => {
                self.say(&format!(
                    "Appointment #{} moved to {}",
                    outcome.appointment.id,
                    format_timestamp_to_display(&outcome.appointment.appointment_date)
                ))
                .await?;
                self.board.absorb(outcome.appointments);
                Ok(())
            }
            Err(e) => self.report(e).await,
        }
    }

    async fn dashboard(&mut self) -> io::Result<()> {
        let summary = match DashboardSummary::load(self.store.as_ref()).await {
            Ok(summary) => summary,
            Err(e) => return self.report(e).await,
        };

        if summary.is_new_user() {
            return self.say("No appointments yet. Type 'book' to make your first one.").await;
        }

        self.say(&format!(
            "{} upcoming, {} past, {} medical fields",
            summary.upcoming.len(),
            summary.past.len(),
            summary.medical_fields.len()
        ))
        .await?;
        if let Some(next) = summary.next_appointment() {
            let line = self.describe(next);
            self.say(&format!("Next: {}", line)).await?;
        }
        Ok(())
    }
}
