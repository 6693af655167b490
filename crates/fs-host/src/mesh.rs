//! Mesh lifecycle and solve control.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::capability::SolveOutcome;
use crate::dispatch::read;
use crate::error::{HostError, HostResult};
use crate::resolver::{SignatureResolver, Unresolved};
use crate::session::Session;
use crate::variant::{ObjectRef, Variant};

/// Busy-flag polling after a solve call.
#[derive(Clone, Debug, PartialEq)]
pub struct SolvePolicy {
    pub poll_interval: Duration,
    pub max_polls: usize,
}

impl Default for SolvePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_polls: 600,
        }
    }
}

/// The one solve failure known to clear after a forced mesh build: an
/// air-type region reported without a mesh.
pub fn is_transient_air_mesh(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("has no mesh") && m.contains("air")
}

fn mesh_shapes<'a>(
    resolver: SignatureResolver<'a, ()>,
    target: &'a ObjectRef,
    names: [&'static str; 3],
) -> SignatureResolver<'a, ()> {
    resolver
        .shape(names[0], move || {
            target
                .invoke("BuildMesh", &[Variant::Bool(true), Variant::Bool(false)])
                .map(|_| ())
        })
        .shape(names[1], move || {
            target.invoke("BuildMesh", &[Variant::Bool(true)]).map(|_| ())
        })
        .shape(names[2], move || target.invoke("BuildMesh", &[]).map(|_| ()))
}

/// Build the mesh on the shape collection, then on the model itself.
pub fn build_mesh(session: &Session) -> HostResult<()> {
    let shapes = session.shapes().ok();
    let mut resolver = SignatureResolver::new("build mesh");
    if let Some(shapes) = shapes.as_ref() {
        resolver = mesh_shapes(
            resolver,
            shapes,
            [
                "Shapes.BuildMesh(true, false)",
                "Shapes.BuildMesh(true)",
                "Shapes.BuildMesh()",
            ],
        );
    }
    resolver = mesh_shapes(
        resolver,
        session.model(),
        [
            "Model.BuildMesh(true, false)",
            "Model.BuildMesh(true)",
            "Model.BuildMesh()",
        ],
    );
    let resolved = resolver.resolve().map_err(|err| HostError::Mesh {
        detail: err.message(),
    })?;
    debug!(shape = resolved.shape, "mesh built");
    Ok(())
}

/// Remove the mesh from the shape collection or the model.
pub fn remove_mesh(session: &Session) -> HostResult<()> {
    let shapes = session.shapes().ok();
    let model = session.model();
    SignatureResolver::new("remove mesh")
        .shape_if(shapes.is_some(), "Shapes.RemoveMesh()", || match shapes.as_ref() {
            Some(s) => s.invoke("RemoveMesh", &[]).map(|_| ()),
            None => Ok(()),
        })
        .shape("Model.RemoveMesh()", || model.invoke("RemoveMesh", &[]).map(|_| ()))
        .resolve()
        .map(|r| debug!(shape = r.shape, "mesh removed"))
        .map_err(|err| HostError::Mesh {
            detail: err.message(),
        })
}

fn solve_once(session: &Session) -> Result<&'static str, Unresolved> {
    let problem = session.problem();
    SignatureResolver::new("solve")
        .halt_on_engine_failure()
        .shape("SolveProblem()", || problem.invoke("SolveProblem", &[]).map(|_| ()))
        .shape("Solve()", || problem.invoke("Solve", &[]).map(|_| ()))
        .resolve()
        .map(|r| r.shape)
}

/// Poll the busy flag until it clears or the policy's budget runs out.
/// Returns the number of polls that saw the host busy.
fn wait_until_idle(problem: &ObjectRef, policy: &SolvePolicy) -> usize {
    let mut polls = 0;
    while polls < policy.max_polls {
        match read(problem, "IsBusy").ok().and_then(|v| v.as_bool()) {
            Some(true) => {
                polls += 1;
                if !policy.poll_interval.is_zero() {
                    thread::sleep(policy.poll_interval);
                }
            }
            _ => return polls,
        }
    }
    warn!(polls, "host still busy after polling budget");
    polls
}

/// Solve, retrying once on the transient air-region mesh failure, then wait
/// for the host to go idle and trigger result analysis.
pub fn solve(session: &Session) -> HostResult<SolveOutcome> {
    let mut outcome = SolveOutcome::default();
    match solve_once(session) {
        Ok(shape) => debug!(shape, "solve call accepted"),
        Err(err) => {
            let message = err.message();
            if !is_transient_air_mesh(&message) {
                return Err(HostError::Solve { detail: message });
            }
            info!(%message, "transient mesh failure, rebuilding mesh and retrying solve");
            if let Err(mesh_err) = build_mesh(session) {
                warn!(error = %mesh_err, "forced mesh build failed before retry");
            }
            outcome.retried = true;
            if let Err(retry_err) = solve_once(session) {
                let message = retry_err.message();
                if !is_transient_air_mesh(&message) {
                    return Err(HostError::Solve { detail: message });
                }
                warn!(%message, "solve warning ignored after retry");
                outcome.warning = Some(message);
            }
        }
    }

    outcome.polls = wait_until_idle(session.problem(), &session.options().solve);
    outcome.analyzed = session
        .problem()
        .invoke("AnalyzeResults", &[])
        .is_ok();
    debug!(polls = outcome.polls, analyzed = outcome.analyzed, "solve finished");
    Ok(outcome)
}
