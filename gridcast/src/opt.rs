//! Derivative-free optimisers used to fit calibration constants.

use anyhow::bail;

#[derive(Clone, Debug)]
pub struct UnivariateDescentConfig {
    pub init_value: f64,
    pub init_step: f64,
    pub min_step: f64,
    pub max_steps: u64,
    pub acceptable_residual: f64,
}
impl UnivariateDescentConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.init_step == 0.0 {
            bail!("initial step must be non-zero")
        }
        if self.min_step <= 0.0 {
            bail!("min step must be positive")
        }
        if self.acceptable_residual < 0.0 {
            bail!("acceptable residual must be non-negative")
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct UnivariateDescentOutcome {
    pub steps: u64,
    pub optimal_value: f64,
    pub optimal_residual: f64,
}

/// Univariate, derivative-free search. The step is halved and reversed every time the residual
/// worsens, terminating once it shrinks below `min_step`.
pub fn univariate_descent(
    config: &UnivariateDescentConfig,
    mut loss_f: impl FnMut(f64) -> f64,
) -> Result<UnivariateDescentOutcome, anyhow::Error> {
    config.validate()?;

    let mut steps = 0;
    let mut residual = loss_f(config.init_value);
    if residual <= config.acceptable_residual {
        return Ok(UnivariateDescentOutcome {
            steps: 0,
            optimal_value: config.init_value,
            optimal_residual: residual,
        });
    }

    let (mut value, mut step) = (config.init_value, config.init_step);
    let (mut optimal_value, mut optimal_residual) = (value, residual);
    while steps < config.max_steps {
        steps += 1;
        let new_value = value + step;
        let new_residual = loss_f(new_value);

        if new_residual > residual {
            step = -step * 0.5;
            if step.abs() < config.min_step {
                break;
            }
        } else if new_residual < optimal_residual {
            optimal_residual = new_residual;
            optimal_value = new_value;

            if optimal_residual <= config.acceptable_residual {
                break;
            }
        }
        residual = new_residual;
        value = new_value;
    }

    Ok(UnivariateDescentOutcome {
        steps,
        optimal_value,
        optimal_residual,
    })
}

#[derive(Clone, Debug)]
pub struct CoordinateDescentConfig {
    pub init_values: Vec<f64>,
    pub init_step: f64,
    pub min_step: f64,
    pub max_steps_per_axis: u64,
    pub max_rounds: u64,
    /// Stop once a full round improves the residual by less than this.
    pub min_improvement: f64,
}
impl CoordinateDescentConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.init_values.is_empty() {
            bail!("at least one search dimension must be specified")
        }
        if self.max_rounds == 0 {
            bail!("at least one round must be specified")
        }
        if self.min_improvement < 0.0 {
            bail!("min improvement must be non-negative")
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct CoordinateDescentOutcome {
    pub rounds: u64,
    pub steps: u64,
    pub optimal_values: Vec<f64>,
    pub optimal_residual: f64,
}

/// Cyclic coordinate descent: each round runs a [`univariate_descent`] along every axis in turn,
/// holding the remaining axes at their best values so far.
pub fn coordinate_descent(
    config: &CoordinateDescentConfig,
    mut loss_f: impl FnMut(&[f64]) -> f64,
) -> Result<CoordinateDescentOutcome, anyhow::Error> {
    config.validate()?;

    let mut values = config.init_values.clone();
    let mut residual = loss_f(&values);
    let (mut rounds, mut steps) = (0, 0);
    while rounds < config.max_rounds {
        rounds += 1;
        let round_start_residual = residual;
        for axis in 0..values.len() {
            let axis_config = UnivariateDescentConfig {
                init_value: values[axis],
                init_step: config.init_step,
                min_step: config.min_step,
                max_steps: config.max_steps_per_axis,
                acceptable_residual: 0.0,
            };
            let mut probe = values.clone();
            let outcome = univariate_descent(&axis_config, |value| {
                probe[axis] = value;
                loss_f(&probe)
            })?;
            steps += outcome.steps;
            if outcome.optimal_residual < residual {
                values[axis] = outcome.optimal_value;
                residual = outcome.optimal_residual;
            }
        }
        if round_start_residual - residual < config.min_improvement {
            break;
        }
    }

    Ok(CoordinateDescentOutcome {
        rounds,
        steps,
        optimal_values: values,
        optimal_residual: residual,
    })
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use super::*;

    #[test]
    fn univariate_descent_sqrt() {
        let config = UnivariateDescentConfig {
            init_value: 0.0,
            init_step: 0.1,
            min_step: 0.00001,
            max_steps: 100,
            acceptable_residual: 0.0,
        };
        let outcome = univariate_descent(&config, |value| (81.0 - value.powi(2)).powi(2)).unwrap();
        assert_float_absolute_eq!(9.0, outcome.optimal_value, config.min_step);
    }

    #[test]
    fn univariate_descent_already_optimal() {
        let config = UnivariateDescentConfig {
            init_value: 3.0,
            init_step: 0.1,
            min_step: 0.001,
            max_steps: 100,
            acceptable_residual: 1e-9,
        };
        let outcome = univariate_descent(&config, |value| (value - 3.0).powi(2)).unwrap();
        assert_eq!(0, outcome.steps);
        assert_eq!(3.0, outcome.optimal_value);
    }

    #[test]
    fn univariate_descent_invalid_config() {
        let config = UnivariateDescentConfig {
            init_value: 0.0,
            init_step: 0.1,
            min_step: 0.0,
            max_steps: 100,
            acceptable_residual: 0.0,
        };
        let err = univariate_descent(&config, |value| value).unwrap_err();
        assert_eq!("min step must be positive", err.to_string());
    }

    #[test]
    fn coordinate_descent_paraboloid() {
        let config = CoordinateDescentConfig {
            init_values: vec![0.0, 0.0],
            init_step: 0.1,
            min_step: 1e-6,
            max_steps_per_axis: 1_000,
            max_rounds: 20,
            min_improvement: 1e-12,
        };
        let outcome = coordinate_descent(&config, |values| {
            (values[0] - 1.5).powi(2) + (values[1] + 0.5).powi(2)
        })
        .unwrap();
        assert_float_absolute_eq!(1.5, outcome.optimal_values[0], 1e-4);
        assert_float_absolute_eq!(-0.5, outcome.optimal_values[1], 1e-4);
        assert!(outcome.optimal_residual < 1e-8);
    }

    #[test]
    fn coordinate_descent_requires_dimensions() {
        let config = CoordinateDescentConfig {
            init_values: vec![],
            init_step: 0.1,
            min_step: 1e-6,
            max_steps_per_axis: 10,
            max_rounds: 1,
            min_improvement: 0.0,
        };
        assert!(coordinate_descent(&config, |_| 0.0).is_err());
    }
}
