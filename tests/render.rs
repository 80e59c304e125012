use std::sync::Arc;

use classfile_decompiler::attribute_info::BootstrapMethod;
use classfile_decompiler::class_model::ClassModel;
use classfile_decompiler::constant_info::{ConstantPool, ConstantPoolBuilder, ReferenceKind};
use classfile_decompiler::decompile::opcodes::*;
use classfile_decompiler::decompile::{decompile, observers, CodeReader, Element, ElementType, Priority};
use classfile_decompiler::descriptor::JvmType;
use classfile_decompiler::method_info::MethodAccessFlags;
use classfile_decompiler::render::{
    CodeStyle, RenderConfig, RenderError, RenderRegistry, Renderer,
};
use classfile_decompiler::{ClassAccessFlags, Method};

// --- Helpers ---

fn hi(index: u16) -> u8 {
    (index >> 8) as u8
}

fn lo(index: u16) -> u8 {
    index as u8
}

fn statements(method: &Method) -> Vec<Element> {
    decompile(method, CodeReader::from_code(&method.code), observers::ignore()).unwrap()
}

fn class(name: &str, pool: Arc<ConstantPool>, bootstrap: Vec<BootstrapMethod>, methods: Vec<Method>) -> ClassModel {
    ClassModel {
        name: name.into(),
        super_name: Some("java/lang/Object".into()),
        source_file: None,
        access_flags: ClassAccessFlags::PUBLIC,
        constant_pool: pool,
        bootstrap_methods: Arc::from(bootstrap),
        methods,
    }
}

/// Bootstrap method entry for a `LambdaMetafactory` call site.
fn metafactory(pool: &mut ConstantPoolBuilder, functional: &str, backing: (ReferenceKind, u16)) -> BootstrapMethod {
    let factory = pool.method_ref(
        "java/lang/invoke/LambdaMetafactory",
        "metafactory",
        "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;",
    );
    let factory = pool.method_handle(ReferenceKind::InvokeStatic, factory);
    let functional = pool.method_type(functional);
    let backing = pool.method_handle(backing.0, backing.1);
    BootstrapMethod {
        bootstrap_method_ref: factory,
        num_bootstrap_arguments: 3,
        bootstrap_arguments: vec![functional, backing, functional],
    }
}

fn print_hi(pool: &mut ConstantPoolBuilder) -> Vec<u8> {
    let out = pool.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let println = pool.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let text = pool.string("hi");
    vec![
        GETSTATIC, hi(out), lo(out),
        LDC, lo(text),
        INVOKEVIRTUAL, hi(println), lo(println),
        RETURN,
    ]
}

// ---- Statements ----

#[test]
fn test_print_statement() {
    let mut pool = ConstantPool::builder();
    let code = print_hi(&mut pool);
    let method = Method::builder("com/example/Greeter", "greet", "()V")
        .access_flags(MethodAccessFlags::STATIC)
        .code(code)
        .constant_pool(pool.build())
        .build()
        .unwrap();

    let body = statements(&method);
    assert_eq!(
        Renderer::default().render_all(&body).unwrap(),
        "System.out.println(\"hi\");\nreturn;"
    );

    let qualified = CodeStyle {
        use_simple_class_names: false,
        ..CodeStyle::default()
    };
    assert_eq!(
        Renderer::new(qualified.into()).render(&body[0]).unwrap(),
        "java.lang.System.out.println(\"hi\")"
    );
}

#[test]
fn test_assignment_and_increment() {
    let method = Method::builder("com/example/Counter", "count", "()V")
        .access_flags(MethodAccessFlags::STATIC)
        .code(vec![ICONST_0, ISTORE_0, IINC, 0, 1, IINC, 0, 0xfd, RETURN])
        .local_variable(0, "i", JvmType::Int, 2, 7)
        .build()
        .unwrap();
    assert_eq!(
        Renderer::default().render_all(&statements(&method)).unwrap(),
        "int i = 0;\ni++;\ni -= 3;\nreturn;"
    );
}

#[test]
fn test_array_literal() {
    let mut pool = ConstantPool::builder();
    let string = pool.class("java/lang/String");
    let hello = pool.string("Hello!");
    let world = pool.string("World");
    let method = Method::builder("com/example/Arrays", "words", "()V")
        .access_flags(MethodAccessFlags::STATIC)
        .code(vec![
            ICONST_2,
            ANEWARRAY, hi(string), lo(string),
            DUP, ICONST_0, LDC, lo(hello), AASTORE,
            DUP, ICONST_1, LDC, lo(world), AASTORE,
            ASTORE_0,
            RETURN,
        ])
        .constant_pool(pool.build())
        .local_variable(0, "words", JvmType::array_of(JvmType::string()), 15, 1)
        .build()
        .unwrap();
    assert_eq!(
        Renderer::default().render(&statements(&method)[0]).unwrap(),
        "String[] words = new String[] { \"Hello!\", \"World\" }"
    );
}

// ---- Fields and boxing ----

fn count_getter() -> Method {
    let mut pool = ConstantPool::builder();
    let count = pool.field_ref("com/example/Outer", "count", "I");
    Method::builder("com/example/Outer", "getCount", "()I")
        .code(vec![ALOAD_0, GETFIELD, hi(count), lo(count), IRETURN])
        .constant_pool(pool.build())
        .local_variable(0, "this", JvmType::reference("com/example/Outer"), 0, 5)
        .build()
        .unwrap()
}

#[test]
fn test_field_of_this() {
    let body = statements(&count_getter());
    assert_eq!(Renderer::default().render(&body[0]).unwrap(), "return this.count");

    let style = CodeStyle {
        omit_this: true,
        ..CodeStyle::default()
    };
    assert_eq!(
        classfile_decompiler::render::render(&body[0], &style).unwrap(),
        "return count"
    );
}

#[test]
fn test_boxing_renders_the_primitive() {
    let mut pool = ConstantPool::builder();
    let value_of = pool.method_ref("java/lang/Integer", "valueOf", "(I)Ljava/lang/Integer;");
    let method = Method::builder("com/example/Boxes", "box", "(I)Ljava/lang/Integer;")
        .access_flags(MethodAccessFlags::STATIC)
        .code(vec![ILOAD_0, INVOKESTATIC, hi(value_of), lo(value_of), ARETURN])
        .constant_pool(pool.build())
        .local_variable(0, "n", JvmType::Int, 0, 5)
        .build()
        .unwrap();
    assert_eq!(
        Renderer::default().render(&statements(&method)[0]).unwrap(),
        "return n"
    );
}

#[test]
fn test_accessor_is_inlined() {
    let mut pool = ConstantPool::builder();
    let count = pool.field_ref("com/example/Outer", "count", "I");
    let accessor = Method::builder("com/example/Outer", "access$000", "(Lcom/example/Outer;)I")
        .access_flags(MethodAccessFlags::STATIC | MethodAccessFlags::SYNTHETIC)
        .code(vec![ALOAD_0, GETFIELD, hi(count), lo(count), IRETURN])
        .constant_pool(pool.build())
        .local_variable(0, "x0", JvmType::reference("com/example/Outer"), 0, 5)
        .build()
        .unwrap();
    let outer = class("com/example/Outer", Arc::default(), Vec::new(), vec![accessor]);

    let mut pool = ConstantPool::builder();
    let access = pool.method_ref("com/example/Outer", "access$000", "(Lcom/example/Outer;)I");
    let caller = Method::builder("com/example/Outer$Inner", "peek", "(Lcom/example/Outer;)I")
        .access_flags(MethodAccessFlags::STATIC)
        .code(vec![ALOAD_0, INVOKESTATIC, hi(access), lo(access), IRETURN])
        .constant_pool(pool.build())
        .local_variable(0, "outer", JvmType::reference("com/example/Outer"), 0, 5)
        .build()
        .unwrap();
    let body = statements(&caller);

    let renderer = Renderer::default();
    assert_eq!(
        renderer.render(&body[0]).unwrap(),
        "return Outer.access$000(outer)"
    );
    assert_eq!(
        renderer.context().with_resolver(&outer).render(&body[0]).unwrap(),
        "return outer.count"
    );
}

// ---- Lambdas ----

#[test]
fn test_lambda_body_through_resolver() {
    let mut pool = ConstantPool::builder();
    let backing = pool.method_ref("com/example/Tasks", "lambda$task$0", "()V");
    let bootstrap = metafactory(&mut pool, "()V", (ReferenceKind::InvokeStatic, backing));
    let site = pool.invoke_dynamic(0, "run", "()Ljava/lang/Runnable;");
    let lambda_code = print_hi(&mut pool);
    let pool = Arc::new(pool.build());

    let task = Method::builder("com/example/Tasks", "task", "()Ljava/lang/Runnable;")
        .access_flags(MethodAccessFlags::STATIC)
        .code(vec![INVOKEDYNAMIC, hi(site), lo(site), 0, 0, ARETURN])
        .constant_pool(pool.clone())
        .bootstrap_methods(vec![bootstrap.clone()])
        .build()
        .unwrap();
    let body = Method::builder("com/example/Tasks", "lambda$task$0", "()V")
        .access_flags(MethodAccessFlags::PRIVATE | MethodAccessFlags::STATIC | MethodAccessFlags::SYNTHETIC)
        .code(lambda_code)
        .constant_pool(pool.clone())
        .build()
        .unwrap();
    let tasks = class("com/example/Tasks", pool, vec![bootstrap], vec![task.clone(), body]);

    let statements = statements(&task);
    let renderer = Renderer::default();
    assert_eq!(
        renderer
            .context()
            .in_class("com/example/Tasks")
            .with_resolver(&tasks)
            .render(&statements[0])
            .unwrap(),
        "return () -> System.out.println(\"hi\")"
    );
    assert!(matches!(
        renderer.render(&statements[0]),
        Err(RenderError::UnresolvedMethod(_))
    ));
}

#[test]
fn test_method_reference() {
    let mut pool = ConstantPool::builder();
    let parse = pool.method_ref("java/lang/Integer", "parseInt", "(Ljava/lang/String;)I");
    let bootstrap = metafactory(
        &mut pool,
        "(Ljava/lang/Object;)Ljava/lang/Object;",
        (ReferenceKind::InvokeStatic, parse),
    );
    let site = pool.invoke_dynamic(0, "apply", "()Ljava/util/function/Function;");

    let method = Method::builder("com/example/Parsers", "parser", "()Ljava/util/function/Function;")
        .access_flags(MethodAccessFlags::STATIC)
        .code(vec![INVOKEDYNAMIC, hi(site), lo(site), 0, 0, ARETURN])
        .constant_pool(pool.build())
        .bootstrap_methods(vec![bootstrap])
        .build()
        .unwrap();
    assert_eq!(
        Renderer::default().render(&statements(&method)[0]).unwrap(),
        "return Integer::parseInt"
    );
}

#[test]
fn test_string_concatenation() {
    let mut pool = ConstantPool::builder();
    let factory = pool.method_ref(
        "java/lang/invoke/StringConcatFactory",
        "makeConcatWithConstants",
        "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/invoke/CallSite;",
    );
    let factory = pool.method_handle(ReferenceKind::InvokeStatic, factory);
    let recipe = pool.string("Hello, \u{1}!");
    let site = pool.invoke_dynamic(0, "makeConcatWithConstants", "(Ljava/lang/String;)Ljava/lang/String;");
    let bootstrap = BootstrapMethod {
        bootstrap_method_ref: factory,
        num_bootstrap_arguments: 1,
        bootstrap_arguments: vec![recipe],
    };

    let method = Method::builder("com/example/Greeter", "greeting", "(Ljava/lang/String;)Ljava/lang/String;")
        .access_flags(MethodAccessFlags::STATIC)
        .code(vec![ALOAD_0, INVOKEDYNAMIC, hi(site), lo(site), 0, 0, ARETURN])
        .constant_pool(pool.build())
        .bootstrap_methods(vec![bootstrap])
        .local_variable(0, "name", JvmType::string(), 0, 7)
        .build()
        .unwrap();
    assert_eq!(
        Renderer::default().render(&statements(&method)[0]).unwrap(),
        "return \"Hello, \" + name + \"!\""
    );
}

// ---- Custom rules ----

#[test]
fn test_merged_rule_takes_precedence() {
    let mut custom = RenderRegistry::builder();
    custom
        .on(ElementType::Constant)
        .with_priority(Priority::High)
        .when(|e, _| e.as_int_constant() == Some(42))
        .then(|_, _| Ok("ANSWER".to_string()));
    let registry = RenderRegistry::core().merge(&custom.build());
    let renderer = Renderer::new(RenderConfig::default()).with_registry(registry);

    let sum = Element::binary(
        Element::int(42),
        classfile_decompiler::decompile::OperatorType::Plus,
        Element::int(1),
        JvmType::Int,
    );
    assert_eq!(renderer.render(&sum).unwrap(), "ANSWER + 1");
}
