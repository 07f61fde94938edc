//! The per-request state machine: route a validated call and apply it to
//! the caller's session.

use serde_json::{json, Value};

use crate::error::CoreError;
use crate::executor::{JobQueue, JobStart};
use crate::jobs::JobStatus;
use crate::provenance::{ProvenanceRecord, SERVICE_VER_FIELD};
use crate::routing::{route, RpcRoute};
use crate::rpc::RpcRequest;
use crate::session::SessionStore;
use crate::types::JobId;

/// Successful outcome of one RPC call.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcReply {
    Status,
    Provenance(ProvenanceRecord),
    Submitted { job_id: JobId },
    JobStatus { status: JobStatus },
}

impl RpcReply {
    /// Response body for this reply.
    pub fn to_json(&self) -> Result<Value, CoreError> {
        let body = match self {
            RpcReply::Status => json!({"state": "OK"}),
            RpcReply::Provenance(record) => serde_json::to_value(record).map_err(|e| {
                CoreError::Internal(format!("Failed to serialize provenance: {e}"))
            })?,
            RpcReply::Submitted { job_id } => json!({"job_id": job_id}),
            RpcReply::JobStatus { status } => json!({"status": status}),
        };
        Ok(body)
    }
}

/// Route `request` and apply it to the session named by `token`.
///
/// The session is created on first contact. Status queries never touch
/// session state.
pub async fn dispatch(
    request: &RpcRequest,
    token: &str,
    store: &dyn SessionStore,
    queue: &dyn JobQueue,
) -> Result<RpcReply, CoreError> {
    let route = route(request)?;
    tracing::debug!(session = %token, method = %request.method, ?route, "Routed RPC call");

    match route {
        RpcRoute::Status => Ok(RpcReply::Status),

        RpcRoute::GetProvenance => {
            let session = store.get_or_init(token).await;
            let provenance = session.lock().await.provenance().clone();
            Ok(RpcReply::Provenance(provenance))
        }

        RpcRoute::Submit { module, sub_method } => {
            let session = store.get_or_init(token).await;
            let job_id = {
                let mut state = session.lock().await;
                let job_id = state.submit_job(&module, &sub_method, request.context.as_ref())?;

                let start = JobStart {
                    session_token: token.to_string(),
                    job_id: job_id.clone(),
                    module: module.clone(),
                    sub_method: sub_method.clone(),
                    service_ver: request
                        .context_str(SERVICE_VER_FIELD)
                        .unwrap_or_default()
                        .to_string(),
                    params: request.params.clone(),
                    context: request.context.clone(),
                };

                if let Err(e) = queue.enqueue(start) {
                    tracing::warn!(
                        session = %token,
                        job_id = %job_id,
                        error = %e,
                        "Executor rejected subjob, marking it failed",
                    );
                    state.update_job_status(&job_id, JobStatus::Failed)?;
                }
                job_id
            };
            store.persist(token, &session).await?;

            tracing::info!(
                session = %token,
                job_id = %job_id,
                subjob = %format!("{module}.{sub_method}"),
                "Subjob submitted",
            );
            Ok(RpcReply::Submitted { job_id })
        }

        RpcRoute::CheckJob { job_id } => {
            let session = store.get_or_init(token).await;
            let status = session.lock().await.check_job(&job_id)?;
            Ok(RpcReply::JobStatus { status })
        }

        RpcRoute::Unrecognized => Err(CoreError::UnknownMethod),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::provenance::ProvenanceSeed;
    use crate::session::InMemorySessionStore;
    use assert_matches::assert_matches;

    #[derive(Default)]
    struct RecordingQueue {
        started: Mutex<Vec<JobStart>>,
        reject: bool,
    }

    impl JobQueue for RecordingQueue {
        fn enqueue(&self, start: JobStart) -> Result<(), CoreError> {
            if self.reject {
                return Err(CoreError::Internal("queue closed".into()));
            }
            self.started.lock().unwrap().push(start);
            Ok(())
        }
    }

    fn req(body: Value) -> RpcRequest {
        RpcRequest::parse(body).unwrap()
    }

    fn submit_body() -> Value {
        json!({
            "method": "AssemblyUtil._save_assembly_as_fasta_submit",
            "params": [],
            "context": {"service_ver": "1.0"}
        })
    }

    #[tokio::test]
    async fn status_does_not_create_a_session() {
        let store = InMemorySessionStore::new(ProvenanceSeed::default());
        let queue = RecordingQueue::default();
        let reply = dispatch(&req(json!({"method": "CallbackServer.status"})), "t", &store, &queue)
            .await
            .unwrap();
        assert_eq!(reply.to_json().unwrap(), json!({"state": "OK"}));
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn submit_then_check_reports_pending() {
        let store = InMemorySessionStore::new(ProvenanceSeed::default());
        let queue = RecordingQueue::default();

        let reply = dispatch(&req(submit_body()), "t", &store, &queue).await.unwrap();
        let RpcReply::Submitted { job_id } = reply.clone() else {
            panic!("expected a submission reply, got {reply:?}");
        };

        let started = queue.started.lock().unwrap().clone();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].job_id, job_id);
        assert_eq!(started[0].name(), "AssemblyUtil.save_assembly_as_fasta");
        assert_eq!(started[0].service_ver, "1.0");

        let check = req(json!({"method": "X._check_job", "params": [job_id]}));
        let reply = dispatch(&check, "t", &store, &queue).await.unwrap();
        assert_eq!(reply.to_json().unwrap(), json!({"status": "pending"}));
    }

    #[tokio::test]
    async fn provenance_grows_with_each_submission() {
        let store = InMemorySessionStore::new(ProvenanceSeed::default());
        let queue = RecordingQueue::default();
        dispatch(&req(submit_body()), "t", &store, &queue).await.unwrap();
        dispatch(&req(submit_body()), "t", &store, &queue).await.unwrap();

        let reply = dispatch(&req(json!({"method": "CallbackServer.get_provenance"})), "t", &store, &queue)
            .await
            .unwrap();
        assert_matches!(reply, RpcReply::Provenance(ref p) if p.subactions().len() == 2);
    }

    #[tokio::test]
    async fn rejected_enqueue_marks_job_failed() {
        let store = InMemorySessionStore::new(ProvenanceSeed::default());
        let queue = RecordingQueue {
            reject: true,
            ..RecordingQueue::default()
        };

        let RpcReply::Submitted { job_id } =
            dispatch(&req(submit_body()), "t", &store, &queue).await.unwrap()
        else {
            panic!("expected a submission reply");
        };
        let session = store.get("t").await.unwrap();
        assert_eq!(session.lock().await.check_job(&job_id).unwrap(), JobStatus::Failed);
    }

    #[tokio::test]
    async fn submit_without_service_ver_fails() {
        let store = InMemorySessionStore::new(ProvenanceSeed::default());
        let queue = RecordingQueue::default();
        let body = json!({"method": "M._m_submit", "params": []});
        assert_matches!(
            dispatch(&req(body), "t", &store, &queue).await,
            Err(CoreError::MissingContext { .. })
        );
        assert!(queue.started.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_job_and_unknown_method() {
        let store = InMemorySessionStore::new(ProvenanceSeed::default());
        let queue = RecordingQueue::default();
        assert_matches!(
            dispatch(&req(json!({"method": "X._check_job", "params": ["nope"]})), "t", &store, &queue).await,
            Err(CoreError::JobNotFound { id }) if id == "nope"
        );
        assert_matches!(
            dispatch(&req(json!({"method": "x.y", "params": []})), "t", &store, &queue).await,
            Err(CoreError::UnknownMethod)
        );
    }

    #[test]
    fn provenance_reply_serializes_the_full_record() {
        let seed = ProvenanceSeed {
            service: "Svc".into(),
            ..ProvenanceSeed::default()
        };
        let record = ProvenanceRecord::init(&seed, 1_700_000_000_000);
        let body = RpcReply::Provenance(record).to_json().unwrap();
        assert_eq!(body["service"], "Svc");
        assert_eq!(body["epoch"], 1_700_000_000_000_i64);
        assert_eq!(body["subactions"], json!([]));
    }

    /// Submit `count` jobs concurrently on `token`, returning their ids.
    async fn submit_concurrently(
        store: &Arc<InMemorySessionStore>,
        queue: &Arc<RecordingQueue>,
        token: &'static str,
        count: usize,
    ) -> Vec<JobId> {
        let handles: Vec<_> = (0..count)
            .map(|_| {
                let store = Arc::clone(store);
                let queue = Arc::clone(queue);
                tokio::spawn(async move {
                    let request = req(submit_body());
                    match dispatch(&request, token, store.as_ref(), queue.as_ref()).await {
                        Ok(RpcReply::Submitted { job_id }) => job_id,
                        other => panic!("expected a submission reply, got {other:?}"),
                    }
                })
            })
            .collect();

        let mut ids = Vec::with_capacity(count);
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_on_one_token_are_all_recorded() {
        const N: usize = 200;
        let store = Arc::new(InMemorySessionStore::new(ProvenanceSeed::default()));
        let queue = Arc::new(RecordingQueue::default());

        let ids = submit_concurrently(&store, &queue, "t", N).await;

        let distinct: HashSet<_> = ids.iter().collect();
        assert_eq!(distinct.len(), N);

        let session = store.get("t").await.unwrap();
        let state = session.lock().await;
        assert_eq!(state.jobs().len(), N);
        assert_eq!(state.provenance().subactions().len(), N);
        for id in &ids {
            assert_eq!(state.check_job(id).unwrap(), JobStatus::Pending);
        }
        assert_eq!(queue.started.lock().unwrap().len(), N);
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sessions_progress_independently() {
        const N: usize = 50;
        let store = Arc::new(InMemorySessionStore::new(ProvenanceSeed::default()));
        let queue = Arc::new(RecordingQueue::default());

        // A request for "b" completes while "a" is locked.
        let a = store.get_or_init("a").await;
        let held = a.lock().await;
        let reply = tokio::time::timeout(
            Duration::from_secs(5),
            dispatch(&req(submit_body()), "b", store.as_ref(), queue.as_ref()),
        )
        .await
        .expect("token b waited on token a's lock")
        .unwrap();
        assert_matches!(reply, RpcReply::Submitted { .. });
        drop(held);

        let (ids_a, ids_b) = tokio::join!(
            submit_concurrently(&store, &queue, "a", N),
            submit_concurrently(&store, &queue, "b", N),
        );

        let a_state = a.lock().await;
        assert_eq!(a_state.jobs().len(), N);
        assert_eq!(a_state.provenance().subactions().len(), N);
        assert_matches!(a_state.check_job(&ids_b[0]), Err(CoreError::JobNotFound { .. }));
        drop(a_state);

        let b = store.get("b").await.unwrap();
        let b_state = b.lock().await;
        assert_eq!(b_state.jobs().len(), N + 1);
        assert_eq!(b_state.provenance().subactions().len(), N + 1);
        assert_matches!(b_state.check_job(&ids_a[0]), Err(CoreError::JobNotFound { .. }));
    }
}
