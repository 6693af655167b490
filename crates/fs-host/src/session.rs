//! The explicit engine session handle and its `FieldHost` implementation.

use std::path::Path;

use fs_core::{Real, Rect};
use tracing::{debug, info, warn};

use crate::capability::{FieldHost, IntegralComponent, MoveReport, SolveOutcome};
use crate::dispatch::{self, read_object};
use crate::error::{DispatchResult, HostError, HostResult};
use crate::mesh::{self, SolvePolicy};
use crate::resolver::SignatureResolver;
use crate::variant::{ObjectRef, Variant};
use crate::{extract, fields, geometry};

/// Margin added around the tracked rectangle when selecting the moving group.
pub const DEFAULT_GROUP_EPSILON: Real = 1e-6;

/// Tunables for one session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub solve: SolvePolicy,
    pub group_epsilon: Real,
    /// Allow substring matches when looking up result regions by label.
    pub lenient_result_lookup: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            solve: SolvePolicy::default(),
            group_epsilon: DEFAULT_GROUP_EPSILON,
            lenient_result_lookup: false,
        }
    }
}

/// One connected application with its active problem and model.
///
/// Every host operation takes the session explicitly; nothing is cached in
/// globals.
pub struct Session {
    app: ObjectRef,
    problem: ObjectRef,
    model: ObjectRef,
    options: SessionOptions,
}

impl Session {
    /// Attach to `app`, opening `problem` (or using the active one) and
    /// making sure a geometry model is loaded.
    pub fn open(
        app: ObjectRef,
        problem: Option<&Path>,
        model: Option<&Path>,
        options: SessionOptions,
    ) -> HostResult<Self> {
        let problem = open_problem(&app, problem)?;
        let model = ensure_model(&app, &problem, model)?;
        info!(app = app.type_name(), "engine session opened");
        Ok(Self {
            app,
            problem,
            model,
            options,
        })
    }

    pub fn app(&self) -> &ObjectRef {
        &self.app
    }

    pub fn problem(&self) -> &ObjectRef {
        &self.problem
    }

    pub fn model(&self) -> &ObjectRef {
        &self.model
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SessionOptions {
        &mut self.options
    }

    /// Host-constructed point value.
    pub fn point_xy(&self, x: Real, y: Real) -> DispatchResult<Variant> {
        self.app.invoke("PointXY", &[Variant::Real(x), Variant::Real(y)])
    }

    /// The model's shape collection.
    pub fn shapes(&self) -> DispatchResult<ObjectRef> {
        read_object(&self.model, "Shapes")
    }

    /// Ask the host to regenerate the model after structural edits.
    /// Best effort: returns whether any target accepted the call.
    pub fn rebuild(&self) -> bool {
        let rebuilt = SignatureResolver::new("rebuild")
            .shape("Problem.Rebuild()", || self.problem.invoke("Rebuild", &[]).map(|_| ()))
            .shape("Model.Rebuild()", || self.model.invoke("Rebuild", &[]).map(|_| ()))
            .shape("App.Rebuild()", || self.app.invoke("Rebuild", &[]).map(|_| ()))
            .resolve();
        match rebuilt {
            Ok(r) => {
                debug!(shape = r.shape, "model rebuilt");
                true
            }
            Err(err) => {
                warn!(error = %err, "model rebuild not available");
                false
            }
        }
    }

    /// Save the geometry model under a new path.
    pub fn save_model_as(&self, path: &Path) -> HostResult<()> {
        let target = Variant::from(path.to_string_lossy().into_owned());
        SignatureResolver::new("save model")
            .shape("Model.SaveAs(path)", || {
                self.model.invoke("SaveAs", &[target.clone()]).map(|_| ())
            })
            .shape("Problem.SaveAs(path)", || {
                self.problem.invoke("SaveAs", &[target.clone()]).map(|_| ())
            })
            .resolve()
            .map(|_| ())
            .map_err(|err| HostError::ModelLoad {
                message: format!("cannot save model as {}: {}", path.display(), err.message()),
            })
    }
}

fn open_problem(app: &ObjectRef, path: Option<&Path>) -> HostResult<ObjectRef> {
    let connection = |message: String| HostError::Connection { message };
    if let Some(path) = path {
        let problems = read_object(app, "Problems")
            .map_err(|e| connection(format!("no problem collection: {e}")))?;
        problems
            .invoke("Open", &[Variant::from(path.to_string_lossy().into_owned())])
            .map_err(|e| connection(format!("cannot open problem {}: {e}", path.display())))?;
    }
    match dispatch::read(app, "ActiveProblem") {
        Ok(Variant::Object(problem)) => Ok(problem),
        Ok(_) => Err(connection("no active problem".to_string())),
        Err(e) => Err(connection(format!("no active problem: {e}"))),
    }
}

fn ensure_model(
    app: &ObjectRef,
    problem: &ObjectRef,
    path: Option<&Path>,
) -> HostResult<ObjectRef> {
    if let Some(path) = path {
        let arg = Variant::from(path.to_string_lossy().into_owned());
        let opened = SignatureResolver::new("open model")
            .shape("App.Models.Open(path)", || {
                read_object(app, "Models")?.invoke("Open", &[arg.clone()]).map(|_| ())
            })
            .shape("Problem.Models.Open(path)", || {
                read_object(problem, "Models")?.invoke("Open", &[arg.clone()]).map(|_| ())
            })
            .resolve();
        if let Err(err) = opened {
            warn!(
                path = %path.display(),
                error = %err,
                "explicit model open failed, loading problem model"
            );
        }
    }
    if let Ok(Variant::Object(model)) = dispatch::read(problem, "Model") {
        return Ok(model);
    }
    problem
        .invoke("LoadModel", &[])
        .map_err(|e| HostError::ModelLoad {
            message: format!("LoadModel failed: {e}"),
        })?;
    match dispatch::read(problem, "Model") {
        Ok(Variant::Object(model)) => Ok(model),
        _ => Err(HostError::ModelLoad {
            message: "problem has no geometry model".to_string(),
        }),
    }
}

impl FieldHost for Session {
    fn set_field_value(&mut self, label: &str, field: &str, value: Real) -> HostResult<()> {
        fields::set_label_field(self, label, field, value)
    }

    fn union_bounds(&mut self, labels: &[String]) -> HostResult<Rect> {
        geometry::union_bounds(self, labels)
    }

    fn move_group(
        &mut self,
        labels: &[String],
        selection: Rect,
        dx: Real,
        dy: Real,
    ) -> HostResult<MoveReport> {
        geometry::move_group(self, labels, selection, dx, dy)
    }

    fn build_mesh(&mut self) -> HostResult<()> {
        mesh::build_mesh(self)
    }

    fn remove_mesh(&mut self) -> HostResult<()> {
        mesh::remove_mesh(self)
    }

    fn solve(&mut self) -> HostResult<SolveOutcome> {
        mesh::solve(self)
    }

    fn evaluate_integral(
        &mut self,
        contour_labels: &[String],
        integral_id: i32,
    ) -> HostResult<Vec<IntegralComponent>> {
        extract::evaluate_integral(self, contour_labels, integral_id)
    }
}
