// service/job_lifecycle.rs
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    models::jobmodel::*,
    service::{commission::compute_commission, error::ServiceError},
    utils::currency::is_valid_amount,
};

pub fn is_valid_transition(from: JobStatus, to: JobStatus) -> bool {
    match (from, to) {
        (JobStatus::Pending, JobStatus::Accepted) => true,
        (JobStatus::Accepted, JobStatus::InProgress) => true,
        (JobStatus::InProgress, JobStatus::Completed) => true,
        (JobStatus::Pending, JobStatus::Cancelled) => true,
        (JobStatus::Accepted, JobStatus::Cancelled) => true,
        (JobStatus::InProgress, JobStatus::Cancelled) => true,
        _ => false,
    }
}

/// States from which a role may cancel.
pub fn cancellable_from(role: ActorRole) -> &'static [JobStatus] {
    match role {
        ActorRole::Customer => &[JobStatus::Pending, JobStatus::Accepted],
        ActorRole::Professional => &[
            JobStatus::Pending,
            JobStatus::Accepted,
            JobStatus::InProgress,
        ],
    }
}

pub fn ensure_participant(job: &Job, actor: &Actor) -> Result<(), ServiceError> {
    if job.is_participant(actor) {
        Ok(())
    } else {
        Err(ServiceError::UnauthorizedJobAccess(actor.id, job.id))
    }
}

pub fn ensure_role(job: &Job, actor: &Actor, role: ActorRole) -> Result<(), ServiceError> {
    if actor.role != role {
        return Err(ServiceError::UnauthorizedJobAccess(actor.id, job.id));
    }
    ensure_participant(job, actor)
}

/// Build a fresh `pending` job booked by `customer`.
pub fn create(customer: &Actor, draft: NewJob, now: DateTime<Utc>) -> Result<Job, ServiceError> {
    if customer.role != ActorRole::Customer {
        return Err(ServiceError::Validation(
            "Only customers can create jobs".to_string(),
        ));
    }
    if draft.professional_id == customer.id {
        return Err(ServiceError::Validation(
            "A customer cannot book themselves".to_string(),
        ));
    }
    if !is_valid_amount(draft.budget.min)
        || !is_valid_amount(draft.budget.max)
        || draft.budget.max < draft.budget.min
    {
        return Err(ServiceError::Validation(format!(
            "Invalid budget range {}..{}",
            draft.budget.min, draft.budget.max
        )));
    }
    let description = draft.description.trim().to_string();
    if description.is_empty() {
        return Err(ServiceError::Validation(
            "Description is required".to_string(),
        ));
    }

    Ok(Job {
        id: Uuid::new_v4(),
        customer_id: customer.id,
        professional_id: draft.professional_id,
        category: draft.category,
        description,
        scheduled_for: draft.scheduled_for,
        budget: draft.budget,
        status: JobStatus::Pending,
        status_history: vec![StatusHistoryEntry {
            status: JobStatus::Pending,
            changed_at: now,
            changed_by: customer.id,
            changed_by_role: customer.role,
            notes: None,
        }],
        final_price: None,
        commission: None,
        payment: JobPayment::new(draft.payment_method),
        invoice: None,
        version: 0,
        created_at: now,
        updated_at: now,
    })
}

pub fn accept(job: &mut Job, actor: &Actor, now: DateTime<Utc>) -> Result<(), ServiceError> {
    ensure_role(job, actor, ActorRole::Professional)?;
    transition(job, JobStatus::Accepted, actor, None, now)
}

pub fn start(job: &mut Job, actor: &Actor, now: DateTime<Utc>) -> Result<(), ServiceError> {
    ensure_role(job, actor, ActorRole::Professional)?;
    transition(job, JobStatus::InProgress, actor, None, now)
}

/// Completes the job, fixing the final price and the commission split in the
/// same step. Nothing is written to `job` unless every check passes.
pub fn complete(
    job: &mut Job,
    actor: &Actor,
    final_price: i64,
    commission_rate_bps: i64,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    ensure_role(job, actor, ActorRole::Professional)?;
    if !is_valid_amount(final_price) {
        return Err(ServiceError::Validation(
            "Final price is out of range".to_string(),
        ));
    }
    check_transition(job, JobStatus::Completed)?;
    let commission = compute_commission(final_price, commission_rate_bps)?;

    transition(job, JobStatus::Completed, actor, None, now)?;
    job.final_price = Some(final_price);
    job.commission = Some(commission);
    Ok(())
}

pub fn cancel(
    job: &mut Job,
    actor: &Actor,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    ensure_participant(job, actor)?;
    if !cancellable_from(actor.role).contains(&job.status) {
        return Err(ServiceError::InvalidStateTransition {
            job_id: job.id,
            from: job.status,
            to: JobStatus::Cancelled,
        });
    }
    let notes = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    transition(job, JobStatus::Cancelled, actor, notes, now)
}

fn check_transition(job: &Job, to: JobStatus) -> Result<(), ServiceError> {
    if is_valid_transition(job.status, to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStateTransition {
            job_id: job.id,
            from: job.status,
            to,
        })
    }
}

fn transition(
    job: &mut Job,
    to: JobStatus,
    actor: &Actor,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    check_transition(job, to)?;

    job.status_history.push(StatusHistoryEntry {
        status: to,
        changed_at: now,
        changed_by: actor.id,
        changed_by_role: actor.role,
        notes,
    });
    job.status = to;
    Ok(())
}

/// True when `history` starts at `pending` and every later entry is a legal
/// step from its predecessor.
pub fn validate_history(history: &[StatusHistoryEntry]) -> bool {
    match history.first() {
        Some(first) if first.status == JobStatus::Pending => history
            .windows(2)
            .all(|pair| is_valid_transition(pair[0].status, pair[1].status)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn new_job(method: PaymentMethod) -> (Job, Actor, Actor) {
        let customer = Actor::customer(Uuid::new_v4());
        let professional = Actor::professional(Uuid::new_v4());
        let job = create(
            &customer,
            NewJob {
                professional_id: professional.id,
                category: ServiceCategory::Electrical,
                description: "Replace ceiling fan".to_string(),
                scheduled_for: Utc::now(),
                budget: Budget { min: 5000, max: 20000 },
                payment_method: method,
            },
            Utc::now(),
        )
        .unwrap();
        (job, customer, professional)
    }

    #[test]
    fn happy_path_records_every_step() {
        let (mut job, _customer, pro) = new_job(PaymentMethod::Cash);
        let now = Utc::now();

        accept(&mut job, &pro, now).unwrap();
        start(&mut job, &pro, now).unwrap();
        complete(&mut job, &pro, 15000, 1000, now).unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        let statuses: Vec<JobStatus> = job.status_history.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                JobStatus::Pending,
                JobStatus::Accepted,
                JobStatus::InProgress,
                JobStatus::Completed
            ]
        );
        assert!(validate_history(&job.status_history));
    }

    #[test]
    fn completing_fixes_price_and_commission_together() {
        let (mut job, _customer, pro) = new_job(PaymentMethod::Cash);
        let now = Utc::now();
        accept(&mut job, &pro, now).unwrap();
        start(&mut job, &pro, now).unwrap();

        complete(&mut job, &pro, 15000, 1000, now).unwrap();

        assert_eq!(job.final_price, Some(15000));
        assert_eq!(
            job.commission,
            Some(Commission { company_fee: 1500, provider_earnings: 13500 })
        );
    }

    #[test]
    fn non_positive_final_price_leaves_job_untouched() {
        let (mut job, _customer, pro) = new_job(PaymentMethod::Cash);
        let now = Utc::now();
        accept(&mut job, &pro, now).unwrap();
        start(&mut job, &pro, now).unwrap();
        let before = job.clone();

        let err = complete(&mut job, &pro, 0, 1000, now).unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(job, before);
    }

    #[test]
    fn oversized_final_price_is_rejected() {
        let (mut job, _customer, pro) = new_job(PaymentMethod::Cash);
        let now = Utc::now();
        accept(&mut job, &pro, now).unwrap();
        start(&mut job, &pro, now).unwrap();
        let before = job.clone();

        let err = complete(&mut job, &pro, i64::MAX, 1000, now).unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(job, before);
    }

    #[test]
    fn steps_cannot_be_skipped() {
        let (mut job, _customer, pro) = new_job(PaymentMethod::Cash);

        let err = start(&mut job, &pro, Utc::now()).unwrap_err();

        assert!(matches!(
            err,
            ServiceError::InvalidStateTransition { from: JobStatus::Pending, to: JobStatus::InProgress, .. }
        ));
        assert_eq!(job.status_history.len(), 1);
    }

    #[test]
    fn completed_job_cannot_be_cancelled() {
        let (mut job, customer, pro) = new_job(PaymentMethod::Online);
        let now = Utc::now();
        accept(&mut job, &pro, now).unwrap();
        start(&mut job, &pro, now).unwrap();
        complete(&mut job, &pro, 15000, 1000, now).unwrap();

        for actor in [customer, pro] {
            let err = cancel(&mut job, &actor, None, now).unwrap_err();
            assert!(matches!(
                err,
                ServiceError::InvalidStateTransition { from: JobStatus::Completed, to: JobStatus::Cancelled, .. }
            ));
        }
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn only_the_professional_cancels_in_progress_work() {
        let (mut job, customer, pro) = new_job(PaymentMethod::Cash);
        let now = Utc::now();
        accept(&mut job, &pro, now).unwrap();
        start(&mut job, &pro, now).unwrap();

        let err = cancel(&mut job, &customer, None, now).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidStateTransition { .. }));

        cancel(&mut job, &pro, Some("Part unavailable".to_string()), now).unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(
            job.status_history.last().and_then(|e| e.notes.as_deref()),
            Some("Part unavailable")
        );
    }

    #[test]
    fn strangers_and_wrong_roles_are_rejected() {
        let (mut job, customer, _pro) = new_job(PaymentMethod::Cash);
        let stranger = Actor::professional(Uuid::new_v4());

        assert!(matches!(
            accept(&mut job, &stranger, Utc::now()),
            Err(ServiceError::UnauthorizedJobAccess(_, _))
        ));
        assert!(matches!(
            accept(&mut job, &customer, Utc::now()),
            Err(ServiceError::UnauthorizedJobAccess(_, _))
        ));
    }

    #[test]
    fn invalid_budget_is_rejected() {
        let customer = Actor::customer(Uuid::new_v4());
        let err = create(
            &customer,
            NewJob {
                professional_id: Uuid::new_v4(),
                category: ServiceCategory::Cleaning,
                description: "Deep clean".to_string(),
                scheduled_for: Utc::now(),
                budget: Budget { min: 20000, max: 5000 },
                payment_method: PaymentMethod::Cash,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn history_must_start_pending() {
        let entry = |status| StatusHistoryEntry {
            status,
            changed_at: Utc::now(),
            changed_by: Uuid::nil(),
            changed_by_role: ActorRole::Professional,
            notes: None,
        };

        assert!(!validate_history(&[]));
        assert!(!validate_history(&[entry(JobStatus::Accepted)]));
        assert!(!validate_history(&[entry(JobStatus::Pending), entry(JobStatus::Completed)]));
        assert!(validate_history(&[entry(JobStatus::Pending), entry(JobStatus::Cancelled)]));
    }

    #[derive(Debug, Clone)]
    enum Step {
        Accept,
        Start,
        Complete(i64),
        CancelByCustomer,
        CancelByProfessional,
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Accept),
            Just(Step::Start),
            (-100i64..1_000_000).prop_map(Step::Complete),
            Just(Step::CancelByCustomer),
            Just(Step::CancelByProfessional),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_history_is_always_a_valid_path(steps in prop::collection::vec(arb_step(), 0..12)) {
            let (mut job, customer, pro) = new_job(PaymentMethod::Cash);
            let now = Utc::now();

            for step in steps {
                let before = job.clone();
                let result = match step {
                    Step::Accept => accept(&mut job, &pro, now),
                    Step::Start => start(&mut job, &pro, now),
                    Step::Complete(price) => complete(&mut job, &pro, price, 1000, now),
                    Step::CancelByCustomer => cancel(&mut job, &customer, None, now),
                    Step::CancelByProfessional => cancel(&mut job, &pro, None, now),
                };
                if result.is_err() {
                    prop_assert_eq!(&job, &before);
                }
                prop_assert!(validate_history(&job.status_history));
                prop_assert_eq!(job.status_history.last().map(|e| e.status), Some(job.status));
            }

            if job.status == JobStatus::Completed {
                let price = job.final_price.unwrap();
                let commission = job.commission.unwrap();
                prop_assert_eq!(commission.company_fee + commission.provider_earnings, price);
            } else {
                prop_assert!(job.final_price.is_none());
                prop_assert!(job.commission.is_none());
            }
        }
    }
}
