// Parameter Marshaller
//
// Turns an ordered list of untyped arguments into a positional call.
// Every argument becomes `@parameter{index}`; output-capable parameters are
// tracked by position so their values can be read back after execution.

use crate::domain::{
    provider_type_of, Arg, BoundParameter, BoundValue, ConfigError, Direction, OutputSlot,
    OutputValues, ProcedureCall, ProviderOutcome, ProviderType, SqlValue,
};

/// Fixed decimal precision. Values needing more digits are rounded or
/// rejected by the provider.
pub const DECIMAL_PRECISION: u8 = 10;
/// Fixed decimal scale
pub const DECIMAL_SCALE: u8 = 2;

/// Build a call for `procedure`. Fails on the first invalid argument, before
/// anything reaches the provider.
pub fn marshal(procedure: &str, args: &[Arg]) -> Result<ProcedureCall, ConfigError> {
    if procedure.trim().is_empty() {
        return Err(ConfigError::EmptyProcedureName);
    }

    let mut parameters = Vec::with_capacity(args.len());
    let mut outputs = Vec::new();
    let mut command_text = format!("{} ", procedure);

    for (position, arg) in args.iter().enumerate() {
        let parameter = bind(position, arg)?;

        command_text.push_str(&parameter.placeholder());
        if matches!(parameter.direction, Direction::Output) {
            command_text.push_str(" out");
        }
        command_text.push_str(", ");

        if parameter.direction.is_output_capable() {
            outputs.push(OutputSlot {
                position,
                name: parameter.name.clone(),
            });
        }
        parameters.push(parameter);
    }

    let command_text = command_text.trim_end_matches(&[',', ' '][..]).to_string();

    Ok(ProcedureCall {
        procedure: procedure.to_string(),
        command_text,
        parameters,
        outputs,
    })
}

fn bind(position: usize, arg: &Arg) -> Result<BoundParameter, ConfigError> {
    let name = format!("parameter{}", position);
    let invalid = || ConfigError::InvalidParameterKind {
        position,
        kind: arg.kind_name(),
    };

    let parameter = match arg {
        Arg::Null => BoundParameter {
            name,
            provider_type: None,
            direction: Direction::Input,
            size: None,
            precision: None,
            scale: None,
            type_name: None,
            value: BoundValue::Scalar(SqlValue::Null),
        },
        Arg::Value(SqlValue::Bytes(_)) => return Err(invalid()),
        Arg::Value(value) => {
            let kind = value.kind().ok_or_else(invalid)?;
            let provider_type = provider_type_of(kind).ok_or_else(invalid)?;
            scalar(name, provider_type, Direction::Input, None, value.clone())
        }
        Arg::Param(p) => {
            let provider_type = provider_type_of(p.kind()).ok_or_else(invalid)?;
            scalar(name, provider_type, p.direction(), p.size(), p.value().clone())
        }
        Arg::Table(table) => BoundParameter {
            name,
            provider_type: Some(ProviderType::Structured),
            direction: Direction::Input,
            size: None,
            precision: None,
            scale: None,
            type_name: Some(table.type_name().to_string()),
            value: BoundValue::Table(table.clone()),
        },
        Arg::Record(_) => return Err(invalid()),
    };
    Ok(parameter)
}

fn scalar(
    name: String,
    provider_type: ProviderType,
    direction: Direction,
    size: Option<u32>,
    value: SqlValue,
) -> BoundParameter {
    let decimal = provider_type == ProviderType::Decimal;
    BoundParameter {
        name,
        provider_type: Some(provider_type),
        direction,
        size,
        precision: decimal.then_some(DECIMAL_PRECISION),
        scale: decimal.then_some(DECIMAL_SCALE),
        type_name: None,
        value: BoundValue::Scalar(value),
    }
}

/// Read back the output-capable parameters of an executed call.
/// Provider null and missing values come back as `None`.
pub fn collect_outputs(call: &ProcedureCall, outcome: &ProviderOutcome) -> OutputValues {
    let entries = call
        .outputs
        .iter()
        .map(|slot| {
            let value = outcome
                .outputs
                .get(&slot.name)
                .filter(|v| !v.is_null())
                .cloned();
            (slot.clone(), value)
        })
        .collect();
    OutputValues::new(entries)
}
