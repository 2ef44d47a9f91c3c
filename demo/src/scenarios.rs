//! Demo scenarios: the signbook flows run end to end against the in-memory
//! store, with a recording mail sender standing in for the recipient's
//! inbox.

use signbook_contracts::{
    audit::RequestMeta,
    error::{SignbookError, SignbookResult},
    ids::LogbookId,
    request::TaskItem,
    signatory::SignatoryDraft,
};
use signbook_core::{AppConfig, LogbookService, SystemClock};
use signbook_mail::RecordingMailSender;
use signbook_store::InMemoryStore;

const SIGNATURE: &str =
    "<svg viewBox=\"0 0 400 160\"><path d=\"M10 80 C 40 10, 65 10, 95 80\"/></svg>";

struct Demo {
    service: LogbookService,
    outbox: RecordingMailSender,
    logbook_id: LogbookId,
}

fn setup() -> SignbookResult<Demo> {
    let outbox = RecordingMailSender::new();
    let service = LogbookService::new(
        Box::new(InMemoryStore::new()),
        Box::new(outbox.clone()),
        Box::new(SystemClock),
        AppConfig::default(),
    );
    let logbook_id = service.create_logbook()?.id;
    Ok(Demo { service, outbox, logbook_id })
}

fn draft(name: &str, email: &str) -> SignatoryDraft {
    SignatoryDraft {
        name: name.to_string(),
        email: email.to_string(),
        licence_no: Some("M-44871".to_string()),
        initials: Some("DR".to_string()),
    }
}

fn sample_task() -> TaskItem {
    TaskItem {
        row_index: 12,
        ata: "05".to_string(),
        task_text: "Inspection following lightning strike".to_string(),
    }
}

impl Demo {
    /// Pull the raw token out of the most recent email, like a recipient
    /// clicking the link.
    fn token_from_inbox(&self, path: &str) -> SignbookResult<String> {
        self.outbox
            .last()
            .and_then(|mail| mail.token_after(path))
            .ok_or_else(|| SignbookError::not_found("confirmation link in outbox"))
    }

    fn print_audit_trail(&self) -> SignbookResult<()> {
        println!("  Audit trail:");
        for event in self.service.audit_trail(self.logbook_id)? {
            println!(
                "    #{} {} by {}{}",
                event.sequence,
                event.action,
                event.actor_type,
                event
                    .actor_id
                    .map(|id| format!(" ({})", id))
                    .unwrap_or_default(),
            );
        }
        Ok(())
    }
}

/// Scenario 1: identity verification end to end.
pub fn run_verification() -> SignbookResult<()> {
    println!("── Scenario 1: identity verification ───────────────────────────");
    let demo = setup()?;

    let signatory =
        demo.service
            .create_signatory(demo.logbook_id, 3, draft("Dana Reyes", "dana@example.com"))?;
    println!("  created signatory in slot 3, status {}", signatory.status);

    demo.service.send_verification(signatory.id)?;
    let mail = demo.outbox.last().ok_or_else(|| SignbookError::not_found("email"))?;
    println!("  emailed '{}' to {}", mail.subject, mail.to);

    let token = demo.token_from_inbox("/signatory/verify/")?;
    let meta = RequestMeta {
        ip: Some("203.0.113.9".to_string()),
        user_agent: Some("demo-browser".to_string()),
    };
    let verified = demo.service.confirm_verification(&token, SIGNATURE, meta)?;
    println!("  recipient confirmed; status now {}", verified.status);

    demo.print_audit_trail()?;
    println!();
    Ok(())
}

/// Scenario 2: task-signature request, confirmation, and replay rejection.
pub fn run_task_signing() -> SignbookResult<()> {
    println!("── Scenario 2: task signing ────────────────────────────────────");
    let demo = setup()?;

    let signatory =
        demo.service
            .create_signatory(demo.logbook_id, 1, draft("Dana Reyes", "dana@example.com"))?;
    demo.service.send_verification(signatory.id)?;
    let token = demo.token_from_inbox("/signatory/verify/")?;
    demo.service
        .confirm_verification(&token, SIGNATURE, RequestMeta::none())?;
    println!("  signatory verified with a saved signature");

    demo.service
        .request_task_signatures(demo.logbook_id, signatory.id, vec![sample_task()])?;
    let token = demo.token_from_inbox("/sign/")?;
    let request = demo
        .service
        .confirm_task_signatures(&token, RequestMeta::none())?;
    println!(
        "  signed {} task(s), first row index {}",
        request.tasks.len(),
        request.tasks[0].row_index
    );

    // Replaying the link must fail.
    match demo.service.confirm_task_signatures(&token, RequestMeta::none()) {
        Err(SignbookError::AlreadyUsed) => {
            println!("  replaying the same link: link already used (rejected)");
        }
        other => {
            println!("  unexpected replay outcome: {:?}", other);
        }
    }

    demo.print_audit_trail()?;
    println!();
    Ok(())
}

/// Scenario 3: the guard rails — precondition, conflict, and bad tokens.
pub fn run_guards() -> SignbookResult<()> {
    println!("── Scenario 3: guard rails ─────────────────────────────────────");
    let demo = setup()?;

    let signatory =
        demo.service
            .create_signatory(demo.logbook_id, 5, draft("Eli Stone", "eli@example.com"))?;

    // Draft signatory cannot be asked to sign tasks.
    match demo
        .service
        .request_task_signatures(demo.logbook_id, signatory.id, vec![sample_task()])
    {
        Err(SignbookError::Precondition { reason }) => {
            println!("  task request against DRAFT signatory: {}", reason);
        }
        other => println!("  unexpected outcome: {:?}", other),
    }

    // A second signatory cannot take the same slot.
    match demo
        .service
        .create_signatory(demo.logbook_id, 5, draft("Ana Cho", "ana@example.com"))
    {
        Err(SignbookError::Conflict { reason }) => {
            println!("  duplicate slot: {}", reason);
        }
        other => println!("  unexpected outcome: {:?}", other),
    }

    // A made-up token matches nothing.
    match demo
        .service
        .confirm_task_signatures(&"0".repeat(64), RequestMeta::none())
    {
        Err(SignbookError::NotFound { what }) => {
            println!("  bogus token: {} not found", what);
        }
        other => println!("  unexpected outcome: {:?}", other),
    }

    demo.print_audit_trail()?;
    println!();
    Ok(())
}
