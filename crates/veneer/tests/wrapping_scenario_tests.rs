//! End-to-end scenario: a logging veneer over a vector type
//!
//! `Vector2` has read/write fields `x`, `y`, a `length` method, and a
//! computed `manhattan` property. `LoggingVector2` declares only a
//! constructor taking a `log` flag. Composing the two yields a class
//! whose instances forward `x`, `y`, `length`, and `manhattan` with
//! shadow-on-write semantics, while methods and getters execute bound to
//! the wrapped vector.

use veneer::{ClassBuilder, ClassId, ObjectModel, Value, VeneerError};

fn vector2(model: &ObjectModel) -> ClassId {
    model
        .define_class(
            ClassBuilder::new("Vector2")
                .field("x")
                .field("y")
                .method("length", |model, this, _| {
                    let x = model.get_attr(this, "x")?.as_f64().unwrap_or(0.0);
                    let y = model.get_attr(this, "y")?.as_f64().unwrap_or(0.0);
                    Ok(Value::Float((x * x + y * y).sqrt()))
                })
                .getter("manhattan", |model, this| {
                    let x = model.get_attr(this, "x")?.as_f64().unwrap_or(0.0);
                    let y = model.get_attr(this, "y")?.as_f64().unwrap_or(0.0);
                    Ok(Value::Float(x.abs() + y.abs()))
                })
                .constructor(|model, this, args| {
                    let [x, y] = args else {
                        return Err(VeneerError::TypeError("Vector2 expects (x, y)".into()));
                    };
                    model.set_attr(this, "x", x.clone())?;
                    model.set_attr(this, "y", y.clone())?;
                    Ok(())
                }),
        )
        .unwrap()
}

fn logging_vector2(model: &ObjectModel) -> ClassId {
    model
        .define_class(
            ClassBuilder::new("LoggingVector2").constructor(|model, this, args| {
                let [log] = args else {
                    return Err(VeneerError::TypeError(
                        "LoggingVector2 expects (log)".into(),
                    ));
                };
                model.set_attr(this, "log", log.clone())
            }),
        )
        .unwrap()
}

#[test]
fn test_forwarded_method_executes_against_the_wrapped_vector() {
    let model = ObjectModel::new();
    let vec2 = vector2(&model);
    let logging = logging_vector2(&model);
    let generated = model.compose(vec2, logging).unwrap();

    let v = model
        .construct(vec2, &[Value::Int(3), Value::Int(4)])
        .unwrap();
    let p = model
        .construct_wrapping(generated, &v, &[Value::Bool(true)])
        .unwrap();

    assert_eq!(
        model.call_method(&p, "length", &[]).unwrap(),
        Value::Float(5.0)
    );

    // The bound receiver is the wrapped vector, not the proxy.
    let method = model.get_attr(&p, "length").unwrap();
    let method = method.as_method().unwrap();
    assert!(method.receiver().same_object(&v));
    assert_eq!(method.defining_class(), vec2);
}

#[test]
fn test_shadow_write_leaves_the_wrapped_vector_unchanged() {
    let model = ObjectModel::new();
    let vec2 = vector2(&model);
    let logging = logging_vector2(&model);
    let generated = model.compose(vec2, logging).unwrap();

    let v = model
        .construct(vec2, &[Value::Int(3), Value::Int(4)])
        .unwrap();
    let p = model
        .construct_wrapping(generated, &v, &[Value::Bool(true)])
        .unwrap();

    model.set_attr(&p, "x", Value::Int(10)).unwrap();

    assert_eq!(model.get_attr(&p, "x").unwrap(), Value::Int(10));
    assert_eq!(model.get_attr(&v, "x").unwrap(), Value::Int(3));
}

#[test]
fn test_forwarded_getter_reads_the_wrapped_state() {
    let model = ObjectModel::new();
    let vec2 = vector2(&model);
    let logging = logging_vector2(&model);
    let generated = model.compose(vec2, logging).unwrap();

    let v = model
        .construct(vec2, &[Value::Int(3), Value::Int(-4)])
        .unwrap();
    let p = model
        .construct_wrapping(generated, &v, &[Value::Bool(false)])
        .unwrap();

    assert_eq!(
        model.get_attr(&p, "manhattan").unwrap(),
        Value::Float(7.0)
    );

    // Shadowing x on the proxy does not change what the getter computes:
    // it runs in the wrapped vector's context.
    model.set_attr(&p, "x", Value::Int(100)).unwrap();
    assert_eq!(
        model.get_attr(&p, "manhattan").unwrap(),
        Value::Float(7.0)
    );
    assert_eq!(
        model.call_method(&p, "length", &[]).unwrap(),
        Value::Float(5.0)
    );
}

#[test]
fn test_proxy_keeps_its_own_state() {
    let model = ObjectModel::new();
    let vec2 = vector2(&model);
    let logging = logging_vector2(&model);
    let generated = model.compose(vec2, logging).unwrap();

    let v = model
        .construct(vec2, &[Value::Int(3), Value::Int(4)])
        .unwrap();
    let p = model
        .construct_wrapping(generated, &v, &[Value::Bool(true)])
        .unwrap();

    assert_eq!(model.get_attr(&p, "log").unwrap(), Value::Bool(true));
    // "log" is the proxy's own attribute; the wrapped vector knows
    // nothing about it.
    assert!(model.get_attr(&v, "log").is_err());
}

#[test]
fn test_full_scenario() {
    let model = ObjectModel::new();
    let vec2 = vector2(&model);
    let logging = logging_vector2(&model);
    let generated = model.wraps(vec2).apply(logging).unwrap();

    let v = model
        .construct(vec2, &[Value::Int(3), Value::Int(4)])
        .unwrap();
    let p = model
        .construct_wrapping(generated, &v, &[Value::Bool(true)])
        .unwrap();

    assert!(model.get_wrapped(&p).unwrap().same_object(&v));
    assert_eq!(
        model.call_method(&p, "length", &[]).unwrap(),
        Value::Float(5.0)
    );

    model.set_attr(&p, "x", Value::Int(10)).unwrap();
    assert_eq!(model.get_attr(&p, "x").unwrap(), Value::Int(10));
    assert_eq!(model.get_attr(&v, "x").unwrap(), Value::Int(3));

    model.del_attr(&p, "y").unwrap();
    assert!(matches!(
        model.get_attr(&p, "y").unwrap_err(),
        VeneerError::AttributeMissing { .. }
    ));
    model.set_attr(&p, "y", Value::Int(0)).unwrap();
    assert_eq!(model.get_attr(&p, "y").unwrap(), Value::Int(0));
}
