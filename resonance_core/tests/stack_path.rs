use resonance_vm_core::{StackError, StackInstruction, StackValue, StackVm, Tensor};
use serde_json::json;

#[test]
fn tensor_program_from_json_text() {
    let program = StackInstruction::parse_program(
        r#"[
            ["PUSH", [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]],
            ["PUSH", [[0.5, 0.5, 0.5], [0.5, 0.5, 0.5]]],
            ["t_sub"],
            ["DUP"],
            ["T_MUL"]
        ]"#,
    )
    .expect("program parses");

    let mut vm = StackVm::new();
    let out = vm.execute(&program).expect("program runs");
    let expected = Tensor::from_json(&json!([[0.25, 2.25, 6.25], [12.25, 20.25, 30.25]]))
        .expect("tensor");
    assert_eq!(out, vec![StackValue::Tensor(expected)]);
    assert_eq!(vm.stack().len(), 1);
}

#[test]
fn t_add_requires_identical_shapes() {
    let program = StackInstruction::parse_program(
        r#"[["PUSH", [[1, 2], [3, 4]]], ["PUSH", [[1, 2, 3]]], ["T_ADD"]]"#,
    )
    .expect("program parses");

    let err = StackVm::new().execute(&program).unwrap_err();
    assert_eq!(
        err,
        StackError::ShapeMismatch {
            op: "T_ADD",
            left: vec![2, 2],
            right: vec![1, 3],
        }
    );
}

#[test]
fn t_add_result_keeps_input_shape() {
    let program = StackInstruction::parse_program(
        r#"[["PUSH", [[[1], [2]], [[3], [4]]]], ["DUP"], ["T_ADD"]]"#,
    )
    .expect("program parses");

    let out = StackVm::new().execute(&program).expect("program runs");
    let tensor = out[0].as_tensor().expect("tensor result");
    assert_eq!(tensor.shape(), &[2, 2, 1]);
    assert_eq!(tensor.sum(), 20.0);
}

#[test]
fn underflow_names_the_operation() {
    let program = StackInstruction::parse_program(r#"[["PUSH", 1], ["ADD"]]"#).expect("parses");
    let err = StackVm::new().execute(&program).unwrap_err();
    assert_eq!(err, StackError::Underflow { op: "ADD" });
}

#[test]
fn each_run_starts_from_an_empty_stack() {
    let mut vm = StackVm::new();
    let push = StackInstruction::Push(StackValue::Scalar(1.0));
    vm.execute(&[push.clone(), push.clone()]).expect("first run");
    let out = vm.execute(&[push]).expect("second run");
    assert_eq!(out.len(), 1);
}

#[test]
fn ragged_operands_are_rejected_at_parse_time() {
    let err = StackInstruction::parse_program(r#"[["PUSH", [[1, 2], [3]]]]"#).unwrap_err();
    assert!(matches!(err, StackError::InvalidTensor(_)));
}
