//! A small contacts page: controller, list repeat, text binding, models,
//! show/hide and click handlers working against one tree.

use std::cell::RefCell;
use std::rc::Rc;

use watchtree::accessor::{action, path};
use watchtree::{
    AccessorError, MemoryRenderer, NodeId, RepeatTarget, ScopeId, ScopeTree, SharedRenderer, Value,
};
use watchtree_directives::{Click, Model, bind, click, controller, model, repeat, show};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn contact(name: &str) -> Value {
    Value::object([("name", Value::text(name))])
}

struct Page {
    tree: ScopeTree,
    renderer: Rc<RefCell<MemoryRenderer>>,
    ctrl: ScopeId,
    count: NodeId,
    list: NodeId,
    new_name: Model,
    show_list: Model,
    add: Click,
    removes: Rc<RefCell<Vec<Click>>>,
}

impl Page {
    fn build() -> Self {
        init_logger();
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let renderer = MemoryRenderer::shared();
        let shared: SharedRenderer = renderer.clone();

        let (count, toggle, list, input) = {
            let mut renderer = renderer.borrow_mut();
            let page = renderer.root();
            (
                renderer.append(page),
                renderer.append(page),
                renderer.append(page),
                renderer.append(page),
            )
        };

        let ctrl = controller(&mut tree, root, |tree, scope| {
            tree.set(scope, "contacts", Value::list([contact("Ada"), contact("Grace")]))?;
            tree.set(scope, "newName", Value::text(""))?;
            tree.set(scope, "showList", Value::bool(true))?;
            Ok(())
        })
        .unwrap();

        bind(&mut tree, ctrl, count, path("contacts.length").unwrap(), shared.clone()).unwrap();
        let show_list = model(&mut tree, ctrl, toggle, path("showList").unwrap(), shared.clone()).unwrap();
        show(&mut tree, ctrl, list, path("showList").unwrap(), shared.clone()).unwrap();
        let new_name = model(&mut tree, ctrl, input, path("newName").unwrap(), shared.clone()).unwrap();

        let add = click(
            ctrl,
            action(|tree, scope| {
                let name = tree.get(scope, "newName")?;
                if name.display_text().is_empty() {
                    return Err(AccessorError::InvalidValue(String::from("name is required")));
                }
                tree.get(scope, "contacts")?.push(contact(&name.display_text()));
                tree.assign(scope, "newName", Value::text(""))?;
                Ok(())
            }),
        );

        let remove = action(|tree, scope| {
            let current = tree.get(scope, "contact")?;
            if let Some(contacts) = tree.get(scope, "contacts")?.as_list() {
                contacts.borrow_mut().retain(|item| !item.same(&current));
            }
            Ok(())
        });
        let removes = Rc::new(RefCell::new(Vec::new()));
        let handlers = Rc::clone(&removes);
        let item_renderer = shared.clone();
        repeat(
            &mut tree,
            ctrl,
            "contact in contacts",
            shared,
            RepeatTarget {
                parent: list,
                anchor: None,
            },
            move |tree, scope, node| {
                bind(tree, scope, node, path("contact.name").unwrap(), item_renderer.clone()).unwrap();
                handlers.borrow_mut().push(click(scope, remove.clone()));
            },
        )
        .unwrap();

        tree.digest_root().unwrap();
        Self {
            tree,
            renderer,
            ctrl,
            count,
            list,
            new_name,
            show_list,
            add,
            removes,
        }
    }

    fn list_text(&self) -> String {
        self.renderer.borrow().text_content(self.list)
    }

    fn count_text(&self) -> String {
        self.renderer.borrow().text(self.count).unwrap_or_default().to_owned()
    }

    fn remove_handler(&self, scope: ScopeId) -> Click {
        let handlers = self.removes.borrow();
        let found = handlers.iter().find(|handler| handler.scope() == scope);
        found.cloned().unwrap()
    }
}

#[test]
fn initial_render() {
    let page = Page::build();

    assert_eq!(page.list_text(), "AdaGrace");
    assert_eq!(page.count_text(), "2");
    assert_eq!(page.removes.borrow().len(), 2);
}

#[test]
fn typing_then_adding_appends_a_contact() {
    let mut page = Page::build();

    page.new_name.input_text(&mut page.tree, "Hopper").unwrap();
    assert_eq!(
        page.tree.get(page.ctrl, "newName").unwrap(),
        Value::text("Hopper")
    );

    page.add.fire(&mut page.tree).unwrap();

    assert_eq!(page.list_text(), "AdaGraceHopper");
    assert_eq!(page.count_text(), "3");
    assert_eq!(page.tree.get(page.ctrl, "newName").unwrap(), Value::text(""));
}

#[test]
fn adding_without_a_name_is_rejected() {
    let mut page = Page::build();

    assert!(page.add.fire(&mut page.tree).is_err());
    assert_eq!(page.list_text(), "AdaGrace");
}

#[test]
fn unchecking_hides_the_list() {
    let mut page = Page::build();

    page.show_list.set_checked(&mut page.tree, false).unwrap();

    assert_eq!(page.renderer.borrow().is_visible(page.list), Some(false));
    assert_eq!(page.renderer.borrow().text_content(page.renderer.borrow().root()), "2");

    page.show_list.set_checked(&mut page.tree, true).unwrap();
    assert_eq!(page.list_text(), "AdaGrace");
}

#[test]
fn item_click_digests_only_its_own_scope() {
    let mut page = Page::build();
    let first = page.tree.children(page.ctrl).unwrap()[0];

    page.remove_handler(first).fire(&mut page.tree).unwrap();

    // The repeat watches the controller scope, which the item digest skips
    assert_eq!(page.list_text(), "AdaGrace");

    page.tree.digest_root().unwrap();
    assert_eq!(page.list_text(), "Grace");
    assert_eq!(page.count_text(), "1");
    assert!(!page.tree.is_alive(first));
}
