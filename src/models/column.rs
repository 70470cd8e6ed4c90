//! Fixed-bed column discretised by the method of lines
//!
//! # Model equations
//!
//! Every field `u` of the column obeys the conservation law
//!
//! $$\frac{\partial u}{\partial t} = \frac{\partial f}{\partial x} + s$$
//!
//! where `f` is the field's [`FluxLaw`] (for a mobile field `f = D ∂u/∂x - v u`)
//! and `s` the source term given by the local [`Reaction`]. The bed of the
//! sorbing column carries two fields:
//!
//! - fluid concentration `c`: advection-dispersion, `s_c = -φ s_q`
//! - sorbed loading `q`: stagnant, `s_q = K_F (q*(c) - q)`
//!
//! with the phase ratio `φ = ρ_b (1 - ε) / ε`.
//!
//! # Spatial discretisation
//!
//! On `N` uniformly spaced nodes with spacing `h`, face fluxes
//!
//! ```text
//! F_{i+1/2} = D (u_{i+1} - u_i) / h - v u_face
//! ```
//!
//! use the upstream node value (or the average, see [`AdvectionScheme`]) as
//! `u_face`. Interior nodes evolve with
//!
//! ```text
//! du_i/dt = (F_{i+1/2} - F_{i-1/2}) / h + s_i
//! ```
//!
//! Boundary nodes follow their [`BoundaryRelation`]:
//!
//! - **Constrained** nodes are solved from the adjacent interior node at every
//!   evaluation and get a zero rate. The integrator re-imposes them through
//!   [`PhysicalModel::enforce_constraints`] after each accepted step.
//! - **Evolved** nodes (relation satisfied for any value) integrate the
//!   one-sided balance `(F_{1/2} - f_0) / h + s_0` on the left and
//!   `(f_{N-1} - F_{N-3/2}) / h + s_{N-1}` on the right.
//!
//! # State layout
//!
//! Field-major: entry `f · N + i` holds field `f` at node `i`.
//!
//! # Example
//!
//! ```rust
//! use sorb_rs::config::{ColumnParameters, SorptionParameters};
//! use sorb_rs::models::ColumnModel;
//! use sorb_rs::physics::{PhysicalModel, PhysicalQuantity};
//! use sorb_rs::solver::Grid;
//!
//! let grid = Grid::uniform(10.0, 2000.0, 101, 21).unwrap();
//! let model = ColumnModel::with_sorption(
//!     &grid,
//!     &ColumnParameters::default(),
//!     &SorptionParameters::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(model.fields(), &[PhysicalQuantity::Concentration, PhysicalQuantity::Loading]);
//! assert_eq!(model.dimension(), 202);
//! ```

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::config::{ColumnParameters, SorptionParameters};
use crate::error::{Result, SorbError};
use crate::models::{
    phase_ratio, AdvectionScheme, FluxLaw, InletProfile, Isotherm, LinearDrivingForce, Reaction,
};
use crate::physics::{difference_increment, PhysicalModel, PhysicalQuantity, PhysicalState};
use crate::solver::{BoundaryCondition, BoundaryTreatment, Grid, Side};

/// Column perturbation groups of the banded Jacobian
///
/// A node only reaches its two neighbours, so nodes three apart never share
/// a row.
const STENCIL_GROUPS: usize = 3;

// =================================================================================================
// Field specification
// =================================================================================================

/// Initial values of one field
#[derive(Debug, Clone, PartialEq)]
pub enum InitialCondition {
    /// Same value at every node
    Uniform(f64),
    /// One value per node
    Profile(Vec<f64>),
}

impl Default for InitialCondition {
    fn default() -> Self {
        Self::Uniform(0.0)
    }
}

/// Transport law, boundary statements and initial values of one field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub quantity: PhysicalQuantity,
    pub flux: FluxLaw,
    pub left: BoundaryCondition,
    pub right: BoundaryCondition,
    pub initial: InitialCondition,
}

impl FieldSpec {
    /// Field starting at zero everywhere
    pub fn new(quantity: PhysicalQuantity, flux: FluxLaw, left: BoundaryCondition, right: BoundaryCondition) -> Self {
        Self {
            quantity,
            flux,
            left,
            right,
            initial: InitialCondition::default(),
        }
    }

    pub fn with_initial(mut self, initial: InitialCondition) -> Self {
        self.initial = initial;
        self
    }

    fn boundary(&self, side: Side) -> &BoundaryCondition {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn initial_values(&self, nodes: usize) -> Result<Vec<f64>> {
        let values = match &self.initial {
            InitialCondition::Uniform(value) => vec![*value; nodes],
            InitialCondition::Profile(values) => {
                if values.len() != nodes {
                    return Err(SorbError::invalid(format!(
                        "initial profile of {} has {} values for {} nodes",
                        self.quantity,
                        values.len(),
                        nodes
                    )));
                }
                values.clone()
            }
        };

        if values.iter().any(|v| !v.is_finite()) {
            return Err(SorbError::invalid(format!(
                "initial values of {} must be finite",
                self.quantity
            )));
        }
        Ok(values)
    }
}

// =================================================================================================
// Column model
// =================================================================================================

/// Method-of-lines discretisation of a k-field fixed-bed column
#[derive(Debug, Clone)]
pub struct ColumnModel {
    positions: Vec<f64>,
    spacing: f64,
    fields: Vec<FieldSpec>,
    quantities: Vec<PhysicalQuantity>,
    reaction: Reaction,
    scheme: AdvectionScheme,
    /// `[left, right]` per field
    treatments: Vec<[BoundaryTreatment; 2]>,
    initial: PhysicalState,
    name: String,
}

impl ColumnModel {
    /// Builds the discretisation of `fields` on the nodes of `grid`
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for fewer than 3 nodes, a non-uniform grid, an
    ///   empty or duplicated field list, non-finite transport coefficients,
    ///   malformed initial values or a reaction referring to missing fields.
    /// - `BoundaryUnsolvable` when a boundary relation does not determine the
    ///   boundary value and is not satisfied identically either.
    pub fn new(grid: &Grid, fields: Vec<FieldSpec>, reaction: Reaction, scheme: AdvectionScheme) -> Result<Self> {
        // ====== Step 1: Grid ======

        let nodes = grid.nodes();
        if nodes < 3 {
            return Err(SorbError::invalid(format!(
                "a column needs at least one interior node, got {} nodes",
                nodes
            )));
        }
        let spacing = grid
            .uniform_spacing()
            .ok_or_else(|| SorbError::invalid("column discretisation requires uniformly spaced nodes"))?;

        // ====== Step 2: Fields ======

        if fields.is_empty() {
            return Err(SorbError::invalid("a column needs at least one field"));
        }

        let mut quantities = Vec::with_capacity(fields.len());
        let mut initial = Vec::with_capacity(fields.len());
        for field in &fields {
            if quantities.contains(&field.quantity) {
                return Err(SorbError::invalid(format!("field {} is declared twice", field.quantity)));
            }
            if !(field.flux.dispersion().is_finite() && field.flux.velocity().is_finite()) {
                return Err(SorbError::invalid(format!(
                    "transport coefficients of {} must be finite",
                    field.quantity
                )));
            }
            quantities.push(field.quantity);
            initial.push((field.quantity, DVector::from_vec(field.initial_values(nodes)?)));
        }
        reaction.validate(fields.len())?;

        // ====== Step 3: Boundaries ======

        let t0 = grid.checkpoints()[0];
        let mut treatments = Vec::with_capacity(fields.len());
        for field in &fields {
            let mut pair = [BoundaryTreatment::Constrained; 2];
            for (slot, side) in [Side::Left, Side::Right].into_iter().enumerate() {
                let relation = field.boundary(side).encode(&field.flux, t0)?;
                pair[slot] = relation
                    .classify(&field.flux, side, spacing)
                    .map_err(|what| SorbError::BoundaryUnsolvable {
                        field: field.quantity.to_string(),
                        side,
                        what,
                    })?;
            }
            debug!(
                "column field {}: left {:?}, right {:?}",
                field.quantity, pair[0], pair[1]
            );
            treatments.push(pair);
        }

        Ok(Self {
            positions: grid.positions().to_vec(),
            spacing,
            fields,
            quantities,
            reaction,
            scheme,
            treatments,
            initial: PhysicalState::from_fields(initial)?,
            name: "Column model".to_string(),
        })
    }

    /// Single-field advection-dispersion column fed at the inlet
    ///
    /// The inlet holds `inlet_concentration` (for `pulse_duration` if set),
    /// the outlet is a free outflow and the column starts empty.
    pub fn advection_dispersion(grid: &Grid, params: &ColumnParameters) -> Result<Self> {
        params.validate()?;
        check_length(grid, params)?;

        let fields = vec![FieldSpec::new(
            PhysicalQuantity::Concentration,
            FluxLaw::advection_dispersion(params.dispersion, params.velocity),
            BoundaryCondition::Dirichlet(inlet_profile(params)?),
            BoundaryCondition::Outflow,
        )];

        let mut model = Self::new(grid, fields, Reaction::None, AdvectionScheme::default())?;
        model.name = "Advection-dispersion column".to_string();
        Ok(model)
    }

    /// Two-field column: fluid concentration exchanging with a sorbed loading
    ///
    /// The loading does not move (stagnant flux, zero-flux ends) and follows
    /// linear-driving-force kinetics towards the Langmuir equilibrium.
    pub fn with_sorption(grid: &Grid, params: &ColumnParameters, sorption: &SorptionParameters) -> Result<Self> {
        params.validate()?;
        sorption.validate()?;
        check_length(grid, params)?;

        let fields = vec![
            FieldSpec::new(
                PhysicalQuantity::Concentration,
                FluxLaw::advection_dispersion(params.dispersion, params.velocity),
                BoundaryCondition::Dirichlet(inlet_profile(params)?),
                BoundaryCondition::Outflow,
            ),
            FieldSpec::new(
                PhysicalQuantity::Loading,
                FluxLaw::Stagnant,
                BoundaryCondition::ZeroFlux,
                BoundaryCondition::ZeroFlux,
            ),
        ];

        let kinetics = LinearDrivingForce::new(
            0,
            1,
            sorption.transfer_rate,
            Isotherm::langmuir(sorption.capacity, sorption.affinity)?,
            phase_ratio(sorption.porosity, sorption.density)?,
        )?;

        let mut model = Self::new(
            grid,
            fields,
            Reaction::LinearDrivingForce(kinetics),
            AdvectionScheme::default(),
        )?;
        model.name = "Sorbing column (LDF Langmuir)".to_string();
        Ok(model)
    }

    pub fn with_scheme(mut self, scheme: AdvectionScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn scheme(&self) -> AdvectionScheme {
        self.scheme
    }

    pub fn reaction(&self) -> &Reaction {
        &self.reaction
    }

    pub fn field_spec(&self, field: usize) -> Option<&FieldSpec> {
        self.fields.get(field)
    }

    /// How the boundary node of `field` at `side` is advanced
    pub fn treatment(&self, field: usize, side: Side) -> Option<BoundaryTreatment> {
        let pair = self.treatments.get(field)?;
        Some(match side {
            Side::Left => pair[0],
            Side::Right => pair[1],
        })
    }

    /// `(flux, source)` of `field` given every field's value at a node and
    /// the local gradient of `field`
    ///
    /// # Example
    ///
    /// ```rust
    /// use sorb_rs::config::ColumnParameters;
    /// use sorb_rs::models::ColumnModel;
    /// use sorb_rs::solver::Grid;
    ///
    /// let grid = Grid::uniform(10.0, 100.0, 11, 2).unwrap();
    /// let model = ColumnModel::advection_dispersion(&grid, &ColumnParameters::default()).unwrap();
    ///
    /// // f = D g - v c
    /// let (flux, source) = model.flux_terms(0, &[50.0], 2.0);
    /// assert!((flux - (2e-2 * 2.0 - 1e-3 * 50.0)).abs() < 1e-15);
    /// assert_eq!(source, 0.0);
    /// ```
    pub fn flux_terms(&self, field: usize, local: &[f64], gradient: f64) -> (f64, f64) {
        let mut sources = vec![0.0; self.fields.len()];
        self.reaction.sources(local, &mut sources);
        (self.fields[field].flux.flux(local[field], gradient), sources[field])
    }

    /// Boundary value of `field` at `side` solved from the interior neighbour
    pub fn solve_boundary(&self, t: f64, field: usize, side: Side, state: &DVector<f64>) -> Result<f64> {
        let spec = &self.fields[field];
        let n = self.positions.len();
        let offset = field * n;
        let (node, neighbour) = match side {
            Side::Left => (offset, offset + 1),
            Side::Right => (offset + n - 1, offset + n - 2),
        };

        let unsolvable = |what: String| SorbError::BoundaryUnsolvable {
            field: spec.quantity.to_string(),
            side,
            what,
        };

        let relation = spec.boundary(side).encode(&spec.flux, t)?;
        let value = relation
            .solve(&spec.flux, side, state[neighbour], self.spacing, state[node])
            .map_err(unsolvable)?;
        if !value.is_finite() {
            return Err(unsolvable(format!("boundary value {} at t = {}", value, t)));
        }
        Ok(value)
    }

    fn check_state(&self, state: &DVector<f64>, rate_len: usize) -> Result<()> {
        let expected = self.dimension();
        if state.len() != expected || rate_len != expected {
            return Err(SorbError::invalid(format!(
                "column '{}' expects {} state entries, got {} (rate {})",
                self.name,
                expected,
                state.len(),
                rate_len
            )));
        }
        Ok(())
    }
}

fn check_length(grid: &Grid, params: &ColumnParameters) -> Result<()> {
    if (grid.length() - params.length).abs() > 1e-9 * params.length {
        return Err(SorbError::invalid(format!(
            "grid spans {} but the column is {} long",
            grid.length(),
            params.length
        )));
    }
    Ok(())
}

fn inlet_profile(params: &ColumnParameters) -> Result<InletProfile> {
    match params.pulse_duration {
        Some(duration) => InletProfile::pulse(duration, params.inlet_concentration),
        None => Ok(InletProfile::constant(params.inlet_concentration)),
    }
}

impl PhysicalModel for ColumnModel {
    fn points(&self) -> usize {
        self.positions.len()
    }

    fn fields(&self) -> &[PhysicalQuantity] {
        &self.quantities
    }

    /// Evaluates `du/dt` for every field at every node
    ///
    /// 1. Copy the state and re-solve constrained boundary nodes
    /// 2. Evaluate the node kernel (sequential or Rayon)
    /// 3. Scatter node rates into the field-major rate vector
    fn compute_physics(&self, t: f64, state: &DVector<f64>, rate: &mut DVector<f64>) -> Result<()> {
        self.check_state(state, rate.len())?;

        let n = self.positions.len();
        let k = self.fields.len();
        let h = self.spacing;

        // ── Boundary values ───────────────────────────────────────────────────────
        //
        // Constrained nodes in `state` may be stale (stage values of an implicit
        // method); the kernel only reads the re-solved copy.
        let mut u = state.clone();
        self.enforce_constraints(t, &mut u)?;

        // ── Node kernel ───────────────────────────────────────────────────────────
        //
        // Reads u at nodes i-1..=i+1 of every field, writes nothing. Returns the
        // rate of every field at node i.
        let compute_node = |i: usize| -> Vec<f64> {
            let local: Vec<f64> = (0..k).map(|f| u[f * n + i]).collect();
            let mut sources = vec![0.0; k];
            self.reaction.sources(&local, &mut sources);

            (0..k)
                .map(|f| {
                    let law = &self.fields[f].flux;
                    let at = |node: usize| u[f * n + node];

                    if i == 0 {
                        match self.treatments[f][0] {
                            BoundaryTreatment::Constrained => 0.0,
                            BoundaryTreatment::Evolved => {
                                let outer = law.flux(at(0), Side::Left.gradient(at(0), at(1), h));
                                let inner = law.face_flux(at(0), at(1), h, self.scheme);
                                (inner - outer) / h + sources[f]
                            }
                        }
                    } else if i == n - 1 {
                        match self.treatments[f][1] {
                            BoundaryTreatment::Constrained => 0.0,
                            BoundaryTreatment::Evolved => {
                                let outer = law.flux(at(n - 1), Side::Right.gradient(at(n - 1), at(n - 2), h));
                                let inner = law.face_flux(at(n - 2), at(n - 1), h, self.scheme);
                                (outer - inner) / h + sources[f]
                            }
                        }
                    } else {
                        let east = law.face_flux(at(i), at(i + 1), h, self.scheme);
                        let west = law.face_flux(at(i - 1), at(i), h, self.scheme);
                        (east - west) / h + sources[f]
                    }
                })
                .collect()
        };

        // ── Assembly ──────────────────────────────────────────────────────────────
        let nodes: Vec<Vec<f64>>;
        if self.dimension() > crate::solver::parallel_threshold() {
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;

                nodes = (0..n).into_par_iter().map(&compute_node).collect();
            }
            #[cfg(not(feature = "parallel"))]
            {
                nodes = (0..n).map(&compute_node).collect();
            }
        } else {
            nodes = (0..n).map(&compute_node).collect();
        }

        for (i, node) in nodes.into_iter().enumerate() {
            for (f, value) in node.into_iter().enumerate() {
                rate[f * n + i] = value;
            }
        }
        Ok(())
    }

    fn enforce_constraints(&self, t: f64, state: &mut DVector<f64>) -> Result<()> {
        let n = self.positions.len();

        for (field, pair) in self.treatments.iter().enumerate() {
            if pair[0] == BoundaryTreatment::Constrained {
                let value = self.solve_boundary(t, field, Side::Left, state)?;
                state[field * n] = value;
            }
            if pair[1] == BoundaryTreatment::Constrained {
                let value = self.solve_boundary(t, field, Side::Right, state)?;
                state[field * n + n - 1] = value;
            }
        }
        Ok(())
    }

    /// Banded forward-difference Jacobian
    ///
    /// Columns of one field whose nodes are [`STENCIL_GROUPS`] apart never
    /// reach the same row, so they are perturbed together: `3k` right-hand
    /// side evaluations instead of `N·k`.
    fn jacobian(
        &self,
        t: f64,
        state: &DVector<f64>,
        rate: &DVector<f64>,
        jacobian: &mut DMatrix<f64>,
    ) -> Result<()> {
        let n = self.positions.len();
        let k = self.fields.len();
        let dim = n * k;

        jacobian.fill(0.0);
        let mut perturbed = state.clone();
        let mut shifted = DVector::zeros(dim);

        for field in 0..k {
            for group in 0..STENCIL_GROUPS {
                let columns: Vec<(usize, f64)> = (group..n)
                    .step_by(STENCIL_GROUPS)
                    .map(|node| {
                        let j = field * n + node;
                        let original = state[j];
                        perturbed[j] = original + difference_increment(original);
                        (node, perturbed[j] - original)
                    })
                    .collect();

                self.compute_physics(t, &perturbed, &mut shifted)?;

                for (node, delta) in columns {
                    let j = field * n + node;
                    perturbed[j] = state[j];

                    let first = node.saturating_sub(1);
                    let last = (node + 1).min(n - 1);
                    for g in 0..k {
                        for i in first..=last {
                            let row = g * n + i;
                            jacobian[(row, j)] = (shifted[row] - rate[row]) / delta;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn setup_initial_state(&self) -> PhysicalState {
        self.initial.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        Some("1-D fixed-bed transport discretised by finite volumes (method of lines)")
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::ThresholdGuard;
    use approx::assert_relative_eq;

    fn grid(nodes: usize) -> Grid {
        Grid::uniform(1.0, 10.0, nodes, 2).unwrap()
    }

    fn transported(dispersion: f64, velocity: f64, inlet: f64) -> FieldSpec {
        FieldSpec::new(
            PhysicalQuantity::Concentration,
            FluxLaw::advection_dispersion(dispersion, velocity),
            BoundaryCondition::fixed(inlet),
            BoundaryCondition::Outflow,
        )
    }

    fn sorbing(nodes: usize) -> ColumnModel {
        let params = ColumnParameters {
            length: 1.0,
            dispersion: 1e-3,
            velocity: 1e-2,
            inlet_concentration: 1.0,
            pulse_duration: None,
        };
        let sorption = SorptionParameters {
            porosity: 0.4,
            density: 1.0,
            transfer_rate: 0.1,
            capacity: 1.0,
            affinity: 1.0,
        };
        ColumnModel::with_sorption(&grid(nodes), &params, &sorption).unwrap()
    }

    fn rate_of(model: &ColumnModel, t: f64, state: &DVector<f64>) -> DVector<f64> {
        let mut rate = DVector::zeros(state.len());
        model.compute_physics(t, state, &mut rate).unwrap();
        rate
    }

    fn dense_jacobian(model: &ColumnModel, t: f64, state: &DVector<f64>) -> DMatrix<f64> {
        let n = state.len();
        let base = rate_of(model, t, state);
        let mut jacobian = DMatrix::zeros(n, n);
        let mut perturbed = state.clone();
        for j in 0..n {
            let original = perturbed[j];
            perturbed[j] = original + difference_increment(original);
            let delta = perturbed[j] - original;
            let shifted = rate_of(model, t, &perturbed);
            perturbed[j] = original;
            for i in 0..n {
                jacobian[(i, j)] = (shifted[i] - base[i]) / delta;
            }
        }
        jacobian
    }

    #[test]
    fn test_rejects_too_few_nodes() {
        let result = ColumnModel::new(&grid(2), vec![transported(0.1, 1.0, 1.0)], Reaction::None, AdvectionScheme::Upwind);
        assert!(matches!(result, Err(SorbError::InvalidParameter { .. })));
    }

    #[test]
    fn test_rejects_non_uniform_grid() {
        let grid = Grid::new(vec![0.0, 0.1, 0.5, 1.0], vec![0.0, 1.0]).unwrap();
        let result = ColumnModel::new(&grid, vec![transported(0.1, 1.0, 1.0)], Reaction::None, AdvectionScheme::Upwind);
        assert!(result.unwrap_err().to_string().contains("uniformly"));
    }

    #[test]
    fn test_rejects_duplicate_fields_and_bad_profiles() {
        let twice = vec![transported(0.1, 1.0, 1.0), transported(0.2, 1.0, 1.0)];
        assert!(ColumnModel::new(&grid(5), twice, Reaction::None, AdvectionScheme::Upwind).is_err());

        let short = transported(0.1, 1.0, 1.0).with_initial(InitialCondition::Profile(vec![0.0; 4]));
        assert!(ColumnModel::new(&grid(5), vec![short], Reaction::None, AdvectionScheme::Upwind).is_err());
    }

    #[test]
    fn test_unsolvable_boundary_is_reported_at_construction() {
        // a u + b + D (u₁ - u)/h - v u = 0 with a = v + D/h leaves u undetermined
        let (d, v, h) = (0.1, 1.0, 0.25);
        let field = FieldSpec::new(
            PhysicalQuantity::Concentration,
            FluxLaw::advection_dispersion(d, v),
            BoundaryCondition::Robin {
                coefficient: v + d / h,
                offset: 1.0,
            },
            BoundaryCondition::Outflow,
        );

        match ColumnModel::new(&grid(5), vec![field], Reaction::None, AdvectionScheme::Upwind) {
            Err(SorbError::BoundaryUnsolvable { field, side, .. }) => {
                assert_eq!(field, "Concentration");
                assert_eq!(side, Side::Left);
            }
            other => panic!("expected BoundaryUnsolvable, got {:?}", other.map(|m| m.name().to_string())),
        }
    }

    #[test]
    fn test_boundary_treatments() {
        let model = sorbing(11);
        assert_eq!(model.treatment(0, Side::Left), Some(BoundaryTreatment::Constrained));
        assert_eq!(model.treatment(0, Side::Right), Some(BoundaryTreatment::Constrained));
        assert_eq!(model.treatment(1, Side::Left), Some(BoundaryTreatment::Evolved));
        assert_eq!(model.treatment(1, Side::Right), Some(BoundaryTreatment::Evolved));

        let inviscid = ColumnModel::new(&grid(5), vec![transported(0.0, 1.0, 1.0)], Reaction::None, AdvectionScheme::Upwind)
            .unwrap();
        assert_eq!(inviscid.treatment(0, Side::Right), Some(BoundaryTreatment::Evolved));
        assert_eq!(inviscid.treatment(3, Side::Left), None);
    }

    #[test]
    fn test_linear_profile_is_steady_under_dispersion() {
        let positions: Vec<f64> = grid(11).positions().to_vec();
        let field = FieldSpec::new(
            PhysicalQuantity::Concentration,
            FluxLaw::advection_dispersion(0.3, 0.0),
            BoundaryCondition::fixed(0.0),
            BoundaryCondition::fixed(1.0),
        )
        .with_initial(InitialCondition::Profile(positions.clone()));
        let model = ColumnModel::new(&grid(11), vec![field], Reaction::None, AdvectionScheme::Upwind).unwrap();

        let rate = rate_of(&model, 0.0, &DVector::from_vec(positions));
        for value in rate.iter() {
            assert!(value.abs() < 1e-12, "rate {}", value);
        }
    }

    #[test]
    fn test_upwind_advection_rate() {
        let model = ColumnModel::new(&grid(11), vec![transported(0.0, 2.0, 0.0)], Reaction::None, AdvectionScheme::Upwind)
            .unwrap();
        let state = DVector::from_fn(11, |i, _| i as f64);

        let rate = rate_of(&model, 0.0, &state);
        // -v (u_i - u_{i-1}) / h with h = 0.1
        for i in 1..11 {
            assert_relative_eq!(rate[i], -20.0, max_relative = 1e-12);
        }
        assert_eq!(rate[0], 0.0);
    }

    #[test]
    fn test_central_scheme_averages_faces() {
        let model = ColumnModel::new(&grid(11), vec![transported(0.0, 1.0, 0.0)], Reaction::None, AdvectionScheme::Upwind)
            .unwrap()
            .with_scheme(AdvectionScheme::Central);
        let state = DVector::from_fn(11, |i, _| (i * i) as f64);

        let rate = rate_of(&model, 0.0, &state);
        // -v (u_{i+1} - u_{i-1}) / 2h
        assert_relative_eq!(rate[5], -(36.0 - 16.0) / 0.2, max_relative = 1e-12);
    }

    #[test]
    fn test_enforce_constraints_projects_boundaries() {
        let model = ColumnModel::new(&grid(5), vec![transported(0.1, 1.0, 3.0)], Reaction::None, AdvectionScheme::Upwind)
            .unwrap();
        let mut state = DVector::from_vec(vec![9.0, 1.0, 2.0, 4.0, -7.0]);

        model.enforce_constraints(0.0, &mut state).unwrap();

        assert_eq!(state[0], 3.0);
        assert_relative_eq!(state[4], 4.0, max_relative = 1e-12);
        assert_eq!(&state.as_slice()[1..4], &[1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_rate_ignores_stale_boundary_values() {
        let model = ColumnModel::new(&grid(5), vec![transported(0.1, 1.0, 3.0)], Reaction::None, AdvectionScheme::Upwind)
            .unwrap();
        let projected = DVector::from_vec(vec![3.0, 1.0, 2.0, 4.0, 4.0]);
        let stale = DVector::from_vec(vec![-50.0, 1.0, 2.0, 4.0, 80.0]);

        assert_eq!(rate_of(&model, 0.0, &projected), rate_of(&model, 0.0, &stale));
    }

    #[test]
    fn test_sorption_sources() {
        let model = sorbing(11);
        // uniform fluid equal to the inlet value, clean sorbent
        let mut state = DVector::zeros(22);
        state.rows_mut(0, 11).fill(1.0);

        let rate = rate_of(&model, 0.0, &state);
        // q* = 1 · 1 · 1 / 2, phase ratio = 1 · 0.6 / 0.4
        let uptake = 0.1 * 0.5;
        for i in 0..11 {
            assert_relative_eq!(rate[11 + i], uptake, max_relative = 1e-12);
        }
        for i in 1..10 {
            assert_relative_eq!(rate[i], -1.5 * uptake, max_relative = 1e-9);
        }

        let (flux, source) = model.flux_terms(1, &[1.0, 0.0], 5.0);
        assert_eq!(flux, 0.0);
        assert_relative_eq!(source, uptake, max_relative = 1e-12);
    }

    #[test]
    fn test_banded_jacobian_matches_dense() {
        let model = sorbing(13);
        let state = DVector::from_fn(26, |j, _| if j < 13 { 1.0 - j as f64 / 13.0 } else { 0.05 * (j - 13) as f64 });
        let rate = rate_of(&model, 1.0, &state);

        let mut banded = DMatrix::zeros(26, 26);
        model.jacobian(1.0, &state, &rate, &mut banded).unwrap();
        let dense = dense_jacobian(&model, 1.0, &state);

        for i in 0..26 {
            for j in 0..26 {
                assert_relative_eq!(banded[(i, j)], dense[(i, j)], epsilon = 1e-5, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_parallel_and_sequential_paths_agree() {
        let model = sorbing(101);
        let state = DVector::from_fn(202, |j, _| ((j as f64) * 0.37).sin().abs());

        let sequential = {
            let _guard = ThresholdGuard::save(usize::MAX);
            rate_of(&model, 3.0, &state)
        };
        let parallel = {
            let _guard = ThresholdGuard::save(1);
            rate_of(&model, 3.0, &state)
        };

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_state_length_mismatch() {
        let model = sorbing(11);
        let mut rate = DVector::zeros(11);
        assert!(model.compute_physics(0.0, &DVector::zeros(11), &mut rate).is_err());
    }

    #[test]
    fn test_nonlinear_relation_boundary() {
        // u² - 4 = 0 on the left (q = 0)
        let field = FieldSpec::new(
            PhysicalQuantity::Concentration,
            FluxLaw::advection_dispersion(0.1, 1.0),
            BoundaryCondition::relation(|u| u * u - 4.0, 0.0),
            BoundaryCondition::Outflow,
        )
        .with_initial(InitialCondition::Uniform(1.0));
        let model = ColumnModel::new(&grid(5), vec![field], Reaction::None, AdvectionScheme::Upwind).unwrap();

        let mut state = model.setup_initial_state().into_values();
        model.enforce_constraints(0.0, &mut state).unwrap();
        assert_relative_eq!(state[0], 2.0, max_relative = 1e-10);
    }
}
