use crate::{
    check,
    context::Domain,
    graphics::{
        api::{GraphicsApi, ShaderStage},
        Graphics,
    },
    handle::{Handle, HandleKind, Ownership},
    Error, VelaResult,
};

pub enum ShaderKind {}

impl HandleKind for ShaderKind {
    type Domain = Graphics;

    const OWNERSHIP: Ownership = Ownership::Shared;
    const RESOURCE: &'static str = "shader";

    fn delete(api: &dyn GraphicsApi, name: u32) {
        api.delete_shader(name);
    }
}

pub enum ProgramKind {}

impl HandleKind for ProgramKind {
    type Domain = Graphics;

    const OWNERSHIP: Ownership = Ownership::Shared;
    const RESOURCE: &'static str = "program";

    fn delete(api: &dyn GraphicsApi, name: u32) {
        api.delete_program(name);
    }
}

/// One compiled stage of a program.
#[derive(Debug, Default)]
pub struct Shader {
    handle: Handle<ShaderKind>,
}

impl Shader {
    pub fn new(stage: ShaderStage) -> VelaResult<Self> {
        let handle = Handle::<ShaderKind>::allocate(|api| api.create_shader(stage))?;
        Ok(Self { handle })
    }

    /// Creates and compiles a shader in one go.
    pub fn from_source(stage: ShaderStage, source: &str) -> VelaResult<Self> {
        let shader = Self::new(stage)?;
        shader.set_source(source)?;
        shader.compile()?;
        Ok(shader)
    }

    pub fn set_source(&self, source: &str) -> VelaResult {
        self.handle
            .call(|api, name| api.shader_source(name, source))
    }

    /// Compiles the current source. A failed compile returns the compiler log.
    pub fn compile(&self) -> VelaResult {
        self.handle.call(|api, name| api.compile_shader(name))?;
        if self.is_compiled()? {
            Ok(())
        } else {
            Err(Error::ShaderCompile {
                log: self.info_log()?,
            })
        }
    }

    pub fn is_compiled(&self) -> VelaResult<bool> {
        self.handle.call(|api, name| api.shader_compiled(name))
    }

    pub fn info_log(&self) -> VelaResult<String> {
        self.handle.call(|api, name| api.shader_info_log(name))
    }

    pub fn stage(&self) -> VelaResult<ShaderStage> {
        self.handle.call(|api, name| api.shader_stage(name))
    }

    pub fn handle(&self) -> &Handle<ShaderKind> {
        &self.handle
    }

    pub fn name(&self) -> u32 {
        self.handle.name()
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    pub fn take(&mut self) -> Self {
        Self {
            handle: self.handle.take(),
        }
    }

    pub fn destroy(self) -> VelaResult {
        self.handle.destroy()
    }
}

/// Linked vertex and fragment stages.
#[derive(Debug, Default)]
pub struct Program {
    handle: Handle<ProgramKind>,
}

impl Program {
    pub fn new() -> VelaResult<Self> {
        let handle = Handle::<ProgramKind>::allocate(|api| api.create_program())?;
        Ok(Self { handle })
    }

    /// Creates a program from compiled shaders and links it.
    pub fn from_shaders(shaders: &[&Shader]) -> VelaResult<Self> {
        let program = Self::new()?;
        for shader in shaders {
            program.attach(shader)?;
        }
        program.link()?;
        Ok(program)
    }

    pub fn attach(&self, shader: &Shader) -> VelaResult {
        let shader = usable_shader(shader)?;
        self.handle
            .call(|api, name| api.attach_shader(name, shader))
    }

    pub fn detach(&self, shader: &Shader) -> VelaResult {
        let shader = usable_shader(shader)?;
        self.handle
            .call(|api, name| api.detach_shader(name, shader))
    }

    /// Links the attached shaders. A failed link returns the linker log.
    pub fn link(&self) -> VelaResult {
        self.handle.call(|api, name| api.link_program(name))?;
        if self.is_linked()? {
            Ok(())
        } else {
            Err(Error::ProgramLink {
                log: self.info_log()?,
            })
        }
    }

    pub fn is_linked(&self) -> VelaResult<bool> {
        self.handle.call(|api, name| api.program_linked(name))
    }

    pub fn info_log(&self) -> VelaResult<String> {
        self.handle.call(|api, name| api.program_info_log(name))
    }

    /// Makes this the program used by draws.
    pub fn bind(&self) -> VelaResult {
        self.handle.call(|api, name| api.use_program(name))
    }

    pub fn unbind() -> VelaResult {
        check::call_current::<Graphics, _>(|api| api.use_program(0))
    }

    pub fn is_bound(&self) -> VelaResult<bool> {
        self.handle
            .call(|api, name| api.current_program() == name)
    }

    pub fn handle(&self) -> &Handle<ProgramKind> {
        &self.handle
    }

    pub fn name(&self) -> u32 {
        self.handle.name()
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    pub fn take(&mut self) -> Self {
        Self {
            handle: self.handle.take(),
        }
    }

    pub fn destroy(self) -> VelaResult {
        self.handle.destroy()
    }
}

fn usable_shader(shader: &Shader) -> VelaResult<u32> {
    if shader.is_empty() {
        return Err(Error::EmptyHandle {
            domain: Graphics::NAME,
            resource: ShaderKind::RESOURCE,
        });
    }
    shader.handle.check_ownership()?;
    Ok(shader.name())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        check::Checks,
        graphics::{
            driver::test::{FRAGMENT, VERTEX},
            GraphicsContext,
        },
        NativeErrorKind,
    };

    fn current() -> GraphicsContext {
        let ctx = GraphicsContext::headless();
        ctx.make_current(None).unwrap();
        ctx
    }

    #[test]
    fn compile_failure_carries_the_log_verbatim() {
        let _ctx = current();
        let shader = Shader::new(ShaderStage::Vertex).unwrap();
        shader.set_source("@vertex\nfn vs_main() {\n").unwrap();

        let err = shader.compile().unwrap_err();

        match err {
            Error::ShaderCompile { log } => {
                assert_eq!("2: error: unclosed '{'", log);
                assert_eq!(log, shader.info_log().unwrap());
            }
            other => panic!("expected a compile error, got {other:?}"),
        }
        assert!(!shader.is_compiled().unwrap());
    }

    #[test]
    fn from_source_compiles() {
        let _ctx = current();

        let shader = Shader::from_source(ShaderStage::Fragment, FRAGMENT).unwrap();

        assert!(shader.is_compiled().unwrap());
        assert_eq!(ShaderStage::Fragment, shader.stage().unwrap());
        assert_eq!("", shader.info_log().unwrap());
    }

    #[test]
    fn link_and_bind() {
        let _ctx = current();
        let vs = Shader::from_source(ShaderStage::Vertex, VERTEX).unwrap();
        let fs = Shader::from_source(ShaderStage::Fragment, FRAGMENT).unwrap();

        let program = Program::from_shaders(&[&vs, &fs]).unwrap();
        program.bind().unwrap();

        assert!(program.is_linked().unwrap());
        assert!(program.is_bound().unwrap());

        Program::unbind().unwrap();
        assert!(!program.is_bound().unwrap());
    }

    #[test]
    fn link_failure_carries_the_log() {
        let _ctx = current();
        let vs = Shader::from_source(ShaderStage::Vertex, VERTEX).unwrap();

        let err = Program::from_shaders(&[&vs]).unwrap_err();

        assert!(matches!(
            err,
            Error::ProgramLink { ref log } if log == "error: no fragment shader attached"
        ));
    }

    #[test]
    fn binding_an_unlinked_program_is_an_invalid_operation() {
        let _ctx = current();
        let program = Program::new().unwrap();

        let result = program.bind();

        if Checks::ERRORS {
            assert_eq!(
                Some(NativeErrorKind::InvalidOperation),
                result.unwrap_err().native_kind()
            );
        }
    }

    #[test]
    fn empty_shaders_cannot_be_attached_or_detached() {
        let _ctx = current();
        let program = Program::new().unwrap();

        let attached = program.attach(&Shader::default());
        let detached = program.detach(&Shader::default());

        assert!(matches!(
            attached,
            Err(Error::EmptyHandle {
                resource: "shader",
                ..
            })
        ));
        assert!(matches!(detached, Err(Error::EmptyHandle { .. })));
    }

    #[test]
    fn detach_then_relink_fails() {
        let _ctx = current();
        let vs = Shader::from_source(ShaderStage::Vertex, VERTEX).unwrap();
        let fs = Shader::from_source(ShaderStage::Fragment, FRAGMENT).unwrap();
        let program = Program::from_shaders(&[&vs, &fs]).unwrap();

        program.detach(&fs).unwrap();

        assert!(matches!(program.link(), Err(Error::ProgramLink { .. })));
        assert!(!program.is_linked().unwrap());
    }

    #[test]
    fn shaders_from_another_share_group_are_rejected() {
        let a = current();
        let program = Program::new().unwrap();
        let b = GraphicsContext::headless();
        b.make_current(None).unwrap();
        let foreign = Shader::new(ShaderStage::Vertex).unwrap();
        a.make_current(None).unwrap();

        let result = program.attach(&foreign);

        if Checks::OWNERSHIP {
            assert!(matches!(
                result,
                Err(Error::InvalidOwnership { resource: "shader", .. })
            ));
        }
    }
}
